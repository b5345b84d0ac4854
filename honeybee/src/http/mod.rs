//! HTTP clients

pub mod chat;
pub mod client;
pub mod reader;
