//! Chat completion API client

use chat_completions::{ChatCompletionRequest, ChatCompletionResponse};

use crate::errors::HoneybeeError;
use crate::http::client::HttpClient;

/// OpenAI chat completion path
pub const OPENAI_CHAT_PATH: &str = "/v1/chat/completions";

/// Azure OpenAI chat completion path for a deployment
pub fn azure_chat_path(deployment: &str, api_version: &str) -> String {
    format!(
        "/openai/deployments/{}/chat/completions?api-version={}",
        deployment, api_version
    )
}

impl HttpClient {
    /// Create a chat completion
    pub async fn create_chat_completion(
        &self,
        path: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, HoneybeeError> {
        self.post(path, request).await
    }
}
