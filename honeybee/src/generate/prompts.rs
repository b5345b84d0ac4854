//! Prompt template store

use tracing::{debug, warn};

use honeybee_api::ArtifactKind;

use crate::filesys::dir::Dir;

/// System prompts the generator can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Dockerfile,
    ComposeFile,
    ScanTemplate,
    ExtractApplication,
}

impl PromptKind {
    /// Template file name, also used to look up overrides
    pub fn file_name(&self) -> &'static str {
        match self {
            PromptKind::Dockerfile => "generate_dockerfile.md",
            PromptKind::ComposeFile => "generate_dockercompose.md",
            PromptKind::ScanTemplate => "write_nuclei_rule.md",
            PromptKind::ExtractApplication => "extract_application.md",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            PromptKind::Dockerfile => include_str!("../../prompts/generate_dockerfile.md"),
            PromptKind::ComposeFile => include_str!("../../prompts/generate_dockercompose.md"),
            PromptKind::ScanTemplate => include_str!("../../prompts/write_nuclei_rule.md"),
            PromptKind::ExtractApplication => {
                include_str!("../../prompts/extract_application.md")
            }
        }
    }
}

impl From<ArtifactKind> for PromptKind {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Dockerfile => PromptKind::Dockerfile,
            ArtifactKind::ComposeFile => PromptKind::ComposeFile,
            ArtifactKind::ScanTemplate => PromptKind::ScanTemplate,
        }
    }
}

/// Maps a prompt kind to its instruction text.
///
/// Templates are compiled in. A file with the same name in the override
/// directory replaces the built-in text and is re-read on every request.
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    overrides: Option<Dir>,
}

impl PromptStore {
    pub fn new(overrides: Option<Dir>) -> Self {
        Self { overrides }
    }

    pub fn builtin() -> Self {
        Self::default()
    }

    pub async fn system_prompt(&self, kind: PromptKind) -> String {
        if let Some(dir) = &self.overrides {
            let file = dir.file(kind.file_name());
            if file.exists().await {
                match file.read_string().await {
                    Ok(text) if !text.trim().is_empty() => {
                        debug!("Using prompt override {}", file.path().display());
                        return text;
                    }
                    Ok(_) => warn!("Ignoring empty prompt override {}", file.path().display()),
                    Err(e) => warn!(
                        "Unable to read prompt override {}: {}",
                        file.path().display(),
                        e
                    ),
                }
            }
        }
        kind.builtin().to_string()
    }
}
