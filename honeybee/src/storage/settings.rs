//! Settings file management

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::errors::HoneybeeError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// HoneyBee settings, read from `settings.json`
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Also write logs to the storage logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// URL reader configuration
    #[serde(default)]
    pub reader: ReaderSettings,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Local deploy configuration
    #[serde(default)]
    pub deploy: DeploySettings,

    /// YAML formatting configuration
    #[serde(default)]
    pub format: FormatSettings,
}

impl Settings {
    /// Load settings from `file`, falling back to defaults when it is missing,
    /// then apply environment overrides.
    pub async fn load(file: &File) -> Result<Self, HoneybeeError> {
        let mut settings = if file.exists().await {
            debug!("Reading settings from {}", file.path().display());
            file.read_json::<Settings>().await?
        } else {
            info!(
                "No settings file at {}, using defaults",
                file.path().display()
            );
            Settings::default()
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply environment variable overrides
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let key_var = match self.llm.provider {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::AzureOpenAi => "AZURE_OPENAI_API_KEY",
        };
        if let Some(key) = non_empty(key_var) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(endpoint) = non_empty("AZURE_OPENAI_ENDPOINT") {
            self.llm.azure_endpoint = Some(endpoint);
        }
        if let Some(token) = non_empty("JINA_API_TOKEN") {
            self.reader.api_key = Some(SecretString::from(token));
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "OpenAI", alias = "openai")]
    OpenAi,
    #[serde(rename = "Azure OpenAI", alias = "azure", alias = "azure_openai")]
    AzureOpenAi,
}

/// LLM provider settings
#[derive(Debug, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    /// Model name, or deployment name on Azure
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for the OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default)]
    pub azure_endpoint: Option<String>,

    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_azure_api_version() -> String {
    "2024-07-01-preview".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            model: default_model(),
            openai_base_url: default_openai_base_url(),
            azure_endpoint: None,
            azure_api_version: default_azure_api_version(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// URL-to-markdown reader settings
#[derive(Debug, Deserialize)]
pub struct ReaderSettings {
    #[serde(default = "default_reader_url")]
    pub base_url: String,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    /// Imported content is truncated to this many characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_reader_url() -> String {
    "https://r.jina.ai".to_string()
}

fn default_max_content_chars() -> usize {
    8192
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            base_url: default_reader_url(),
            api_key: None,
            max_content_chars: default_max_content_chars(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Local deploy settings
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySettings {
    /// Orchestrator invocation; `up` and `down` are appended
    #[serde(default = "default_compose_command")]
    pub compose_command: Vec<String>,

    #[serde(default = "default_compose_file_name")]
    pub compose_file_name: String,

    /// How long to wait for the child to exit after an interrupt
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Run `down` and remove the working directory when the child exits on its own
    #[serde(default = "default_true")]
    pub teardown_on_exit: bool,

    /// Remove leftover session directories at startup
    #[serde(default = "default_true")]
    pub reap_stray_sessions: bool,
}

fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}

fn default_compose_file_name() -> String {
    "docker-compose.yaml".to_string()
}

fn default_stop_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            compose_command: default_compose_command(),
            compose_file_name: default_compose_file_name(),
            stop_timeout_secs: default_stop_timeout(),
            teardown_on_exit: true,
            reap_stray_sessions: true,
        }
    }
}

/// YAML normalization settings
#[derive(Debug, Clone, Deserialize)]
pub struct FormatSettings {
    #[serde(default = "default_line_length")]
    pub line_length: usize,
}

fn default_line_length() -> usize {
    120
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            line_length: default_line_length(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from))
}
