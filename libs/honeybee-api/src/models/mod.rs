//! HoneyBee API models
//!
//! Shared by the local HTTP server and anything that talks to it. The
//! artifact types double as the on-disk history record format.

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// ================================= ARTIFACTS ===================================== //

/// What the LLM is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    #[serde(rename = "Dockerfile", alias = "dockerfile")]
    Dockerfile,
    #[serde(rename = "Docker Compose", alias = "compose", alias = "docker_compose")]
    ComposeFile,
    #[serde(rename = "Nuclei", alias = "nuclei", alias = "scan_template")]
    ScanTemplate,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Dockerfile,
        ArtifactKind::ComposeFile,
        ArtifactKind::ScanTemplate,
    ];

    /// Label stored in history records
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Dockerfile => "Dockerfile",
            ArtifactKind::ComposeFile => "Docker Compose",
            ArtifactKind::ScanTemplate => "Nuclei",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "dockerfile" => Some(ArtifactKind::Dockerfile),
            "docker compose" | "compose" | "docker_compose" => Some(ArtifactKind::ComposeFile),
            "nuclei" | "scan_template" => Some(ArtifactKind::ScanTemplate),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Rendering class of a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileKind {
    #[default]
    Code,
    Yaml,
    Markdown,
}

impl FileKind {
    /// Classify the free-form `file_type` string the model emits
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => FileKind::Yaml,
            "markdown" | "md" => FileKind::Markdown,
            _ => FileKind::Code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Code => "code",
            FileKind::Yaml => "yaml",
            FileKind::Markdown => "markdown",
        }
    }
}

/// One file produced by a structured generation.
///
/// `file_type` is kept exactly as the model wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub file_name: String,
    pub file_path: String,
    pub file_content: String,
    #[serde(default)]
    pub file_type: String,
}

impl GeneratedFile {
    pub fn file_kind(&self) -> FileKind {
        FileKind::classify(&self.file_type)
    }

    /// `<file_path>/<file_name>` as shown in captions
    pub fn display_path(&self) -> String {
        format!("{}/{}", self.file_path, self.file_name)
    }
}

/// Result payload of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    Files(Vec<GeneratedFile>),
    Text(String),
}

// ================================= GENERATION ==================================== //

/// Generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub kind: ArtifactKind,
    pub target_name: String,
    #[serde(default)]
    pub misconfigurations: Vec<String>,
    #[serde(default)]
    pub free_text: Option<String>,
    /// Add the packet capture sidecar to generated compose files
    #[serde(default)]
    pub with_trace: bool,
}

/// Generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub kind: ArtifactKind,
    pub target_name: String,
    pub output: GenerationOutput,
    pub history_key: String,
}

/// URL import request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportUrlRequest {
    pub url: String,
}

/// URL import response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportUrlResponse {
    pub application_name: String,
    pub content: String,
    pub truncated: bool,
}

// ================================== HISTORY ====================================== //

/// History query string parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryParams {
    /// Comma separated kind labels
    #[serde(default)]
    pub kinds: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`
    #[serde(default)]
    pub from: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`
    #[serde(default)]
    pub to: Option<String>,
    /// Case-insensitive search over the entry label
    #[serde(default)]
    pub q: Option<String>,
}

/// History entry as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub input_parameters: (String, Vec<String>),
    pub output: serde_json::Value,
}

/// History list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryListResponse {
    pub entries: Vec<HistoryEntryResponse>,
    pub total: usize,
}

// =================================== DEPLOY ====================================== //

/// Local deploy support response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySupportResponse {
    pub supported: bool,
}

/// Local deploy request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub compose_yaml: String,
}

/// Local deploy status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployStatusResponse {
    pub state: String,
    pub working_directory: Option<String>,
    pub output: Vec<String>,
    pub last_exit_code: Option<i32>,
    /// Why the last launch failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Local deploy stop response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployStopResponse {
    pub transcript: Vec<String>,
}
