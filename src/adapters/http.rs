//! HTTP artifact source backed by a blocking `reqwest` client.

use reqwest::blocking::Client;

use crate::ports::{ArtifactSource, FetchError};

const HTTP_USER_AGENT: &str = concat!("cardiosurv/", env!("CARGO_PKG_VERSION"));

/// Downloads artifacts with plain GET requests.
pub struct HttpArtifactSource {
    client: Client,
}

impl HttpArtifactSource {
    /// Build a source with the crate's user agent.
    ///
    /// # Errors
    /// Returns `FetchError::Network` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl ArtifactSource for HttpArtifactSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: format!("Failed to read response body: {e}"),
        })?;

        Ok(bytes.to_vec())
    }
}
