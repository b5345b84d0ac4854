//! LLM access

pub mod client;
