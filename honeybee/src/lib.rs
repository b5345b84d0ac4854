//! HoneyBee Library
//!
//! Core modules for generating misconfigured application environments,
//! capture sidecars, local deploys and the query history.

pub mod app;
pub mod compose;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod generate;
pub mod history;
pub mod http;
pub mod llm;
pub mod logs;
pub mod models;
pub mod server;
pub mod sources;
pub mod storage;
pub mod utils;
