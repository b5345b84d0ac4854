//! Chat completion wire models

pub mod models;

pub use models::*;
