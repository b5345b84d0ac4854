//! Error types for HoneyBee

use thiserror::Error;

/// Main error type for HoneyBee
#[derive(Error, Debug)]
pub enum HoneybeeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The LLM request itself failed. Never retried.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No parsable fenced JSON block within the attempt budget
    #[error("No valid JSON in model output after {attempts} attempts")]
    ParseExhausted { attempts: u32 },

    #[error("No service in the compose document exposes ports")]
    NoExposedService,

    #[error("Invalid compose document: {0}")]
    InvalidCompose(String),

    #[error("A local deploy is already running in {0}")]
    DeployActive(String),

    #[error("No local deploy is running")]
    NoActiveDeploy,

    #[error("Subprocess error: {0}")]
    Subprocess(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HoneybeeError {
    /// Short machine-readable name used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            HoneybeeError::IoError(_) => "io",
            HoneybeeError::JsonError(_) => "json",
            HoneybeeError::YamlError(_) => "yaml",
            HoneybeeError::Transport(_) => "transport_failure",
            HoneybeeError::ParseExhausted { .. } => "parse_exhausted",
            HoneybeeError::NoExposedService => "no_exposed_service",
            HoneybeeError::InvalidCompose(_) => "invalid_compose",
            HoneybeeError::DeployActive(_) => "deploy_active",
            HoneybeeError::NoActiveDeploy => "no_active_deploy",
            HoneybeeError::Subprocess(_) => "subprocess_failure",
            HoneybeeError::InvalidRequest(_) => "invalid_request",
            HoneybeeError::ConfigError(_) => "config",
            HoneybeeError::ServerError(_) => "server",
            HoneybeeError::ShutdownError(_) => "shutdown",
            HoneybeeError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for HoneybeeError {
    fn from(err: reqwest::Error) -> Self {
        HoneybeeError::Transport(err.to_string())
    }
}

impl From<anyhow::Error> for HoneybeeError {
    fn from(err: anyhow::Error) -> Self {
        HoneybeeError::Internal(err.to_string())
    }
}
