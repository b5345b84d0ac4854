//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::HoneybeeError;

/// How requests authenticate against the remote service
#[derive(Debug)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>`
    Bearer(SecretString),
    /// `api-key: <key>` as used by Azure OpenAI
    ApiKey(SecretString),
}

/// HTTP client for a single remote service
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, auth: Auth, timeout: Duration) -> Result<Self, HoneybeeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("honeybee/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            Auth::ApiKey(key) => request.header("api-key", key.expose_secret()),
        }
    }

    /// Make a GET request and return the body as text
    pub async fn get_text(&self, path: &str) -> Result<String, HoneybeeError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = check_status("GET", response).await?;

        Ok(response.text().await?)
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HoneybeeError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        let response = check_status("POST", response).await?;

        let body = response.json().await?;
        Ok(body)
    }
}

async fn check_status(method: &str, response: Response) -> Result<Response, HoneybeeError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!("HTTP {} failed: {} - {}", method, status, body);
    Err(HoneybeeError::Transport(format!(
        "{}: {}",
        status,
        error_message(&body)
    )))
}

/// Pull the human readable message out of an API error envelope
fn error_message(body: &str) -> String {
    serde_json::from_str::<chat_completions::ApiErrorResponse>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}
