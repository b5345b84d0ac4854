//! Integration tests for HoneyBee

mod support;
mod test_generator;
mod test_server;
mod test_sidecar;
mod test_supervisor;
