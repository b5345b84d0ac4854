//! Remote markdown sources

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use url::Url;

use crate::errors::HoneybeeError;
use crate::http::client::{Auth, HttpClient};
use crate::storage::settings::ReaderSettings;

const READER_TIMEOUT: Duration = Duration::from_secs(60);

/// Page content imported from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSource {
    pub url: Url,
    pub content: String,
    pub truncated: bool,
}

/// Fetches web pages as markdown through the reader proxy
pub struct UrlImporter {
    http: HttpClient,
    max_chars: usize,
}

impl UrlImporter {
    pub fn from_settings(settings: &ReaderSettings) -> Result<Self, HoneybeeError> {
        let auth = match &settings.api_key {
            Some(token) => Auth::Bearer(SecretString::from(token.expose_secret().to_string())),
            None => Auth::None,
        };
        Ok(Self {
            http: HttpClient::new(&settings.base_url, auth, READER_TIMEOUT)?,
            max_chars: settings.max_content_chars,
        })
    }

    pub async fn import(&self, raw_url: &str) -> Result<ImportedSource, HoneybeeError> {
        let url = validate_url(raw_url)?;
        info!("Importing {} through {}", url, self.http.base_url());

        let markdown = self.http.read_as_markdown(&url).await?;
        let (content, truncated) = truncate_chars(&markdown, self.max_chars);
        Ok(ImportedSource {
            url,
            content,
            truncated,
        })
    }
}

/// Accept absolute `http`/`https` URLs with a host
pub fn validate_url(raw: &str) -> Result<Url, HoneybeeError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| HoneybeeError::InvalidRequest(format!("Invalid URL {:?}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HoneybeeError::InvalidRequest(format!(
            "Unsupported URL scheme {:?}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(HoneybeeError::InvalidRequest(format!("URL {:?} has no host", raw)));
    }
    Ok(url)
}

/// First `max` characters of `text`, and whether anything was cut
pub fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((end, _)) => (text[..end].to_string(), true),
        None => (text.to_string(), false),
    }
}
