//! Domain models

pub mod history;
pub mod request;

pub use honeybee_api::{ArtifactKind, FileKind, GeneratedFile, GenerationOutput};
