//! Artifact generation

pub mod extract;
pub mod generator;
pub mod pipeline;
pub mod prompts;
