//! Artifact source port: trait for retrieving remote artifact bytes.

/// Errors raised while retrieving a remote artifact.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Trait for fetching the full contents of a remote file.
pub trait ArtifactSource {
    /// Retrieve the complete body behind `url`.
    ///
    /// # Errors
    /// Returns `FetchError` on transport failure or a non-success response.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
