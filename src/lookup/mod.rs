//! Metadata and trailer lookup adapters.
//!
//! Both adapters issue one GET per call with the credential in the query
//! string, so errors are always built from `reqwest::Error::without_url`.

pub mod metadata;
pub mod trailer;

pub use metadata::{MetadataClient, MovieRecord, PLACEHOLDER};
pub use trailer::{TrailerClient, TrailerLink};

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("lookup service unreachable: {0}")]
    Transport(String),
    #[error("lookup service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected lookup response: {0}")]
    Decode(String),
    /// The service answered, but with an error of its own (bad key, quota…).
    #[error("lookup service error: {0}")]
    Upstream(String),
}

/// Longest error body kept in [`LookupError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Send `req` and decode a 2xx JSON body into `T`.
async fn fetch_json<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, LookupError> {
    let response = req
        .send()
        .await
        .map_err(|e| LookupError::Transport(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(LookupError::Status { status: status.as_u16(), body });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| LookupError::Decode(e.without_url().to_string()))
}

fn build_client(timeout_seconds: u64) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| LookupError::Client(e.to_string()))
}
