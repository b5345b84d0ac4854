//! Compose document processing

pub mod format;
pub mod sidecar;
