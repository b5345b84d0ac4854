//! URL reader API client

use url::Url;

use crate::errors::HoneybeeError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Fetch `target` rendered as markdown by the reader proxy
    pub async fn read_as_markdown(&self, target: &Url) -> Result<String, HoneybeeError> {
        self.get_text(&format!("/{}", target)).await
    }
}
