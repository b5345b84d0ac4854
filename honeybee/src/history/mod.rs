//! Query history

pub mod query;
pub mod store;
