//! Plain HTTP text downloads for published sheets and CORS proxies

use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// HTTP client for sheet exports
#[derive(Clone)]
pub struct SheetClient {
    http: reqwest::Client,
}

impl SheetClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { http })
    }

    /// GET `url` and return the body as text
    ///
    /// Non-2xx statuses become `FetchError::Http`; body validation is left to
    /// the caller.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
