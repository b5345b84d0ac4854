//! LLM chat client

use std::time::Duration;

use async_trait::async_trait;
use chat_completions::{ChatCompletionRequest, ChatMessage};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::errors::HoneybeeError;
use crate::http::chat::{azure_chat_path, OPENAI_CHAT_PATH};
use crate::http::client::{Auth, HttpClient};
use crate::storage::settings::{LlmProvider, LlmSettings};

/// One system+user exchange with a chat model.
///
/// Implementations return the raw text of the first choice. Any request
/// failure must surface as [`HoneybeeError::Transport`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, HoneybeeError>;
}

/// Chat client for OpenAI and Azure OpenAI
pub struct LlmClient {
    http: HttpClient,
    chat_path: String,
    model: String,
}

impl LlmClient {
    /// Build a client from the LLM settings
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, HoneybeeError> {
        let api_key = settings
            .api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_string()))
            .ok_or_else(|| {
                HoneybeeError::ConfigError(format!(
                    "No API key configured for provider {:?}",
                    settings.provider
                ))
            })?;
        let timeout = Duration::from_secs(settings.request_timeout_secs);

        let (http, chat_path) = match settings.provider {
            LlmProvider::OpenAi => (
                HttpClient::new(&settings.openai_base_url, Auth::Bearer(api_key), timeout)?,
                OPENAI_CHAT_PATH.to_string(),
            ),
            LlmProvider::AzureOpenAi => {
                let endpoint = settings.azure_endpoint.as_deref().ok_or_else(|| {
                    HoneybeeError::ConfigError("Azure OpenAI requires an endpoint".to_string())
                })?;
                (
                    HttpClient::new(endpoint, Auth::ApiKey(api_key), timeout)?,
                    azure_chat_path(&settings.model, &settings.azure_api_version),
                )
            }
        };

        Ok(Self {
            http,
            chat_path,
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatTransport for LlmClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, HoneybeeError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
        };

        let response = self
            .http
            .create_chat_completion(&self.chat_path, &request)
            .await?;

        // A filtered or empty reply is malformed output, not a transport failure
        let content = response.first_content().unwrap_or_default().to_string();
        debug!(
            "Chat completion from {} returned {} chars",
            self.model,
            content.len()
        );
        Ok(content)
    }
}
