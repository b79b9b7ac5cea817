//! Error types for ghrunt-token.

use thiserror::Error;

/// Token acquisition failed. None of these are recovered locally.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// DNS, connect, TLS or read failure before a status line arrived.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },

    /// The control plane answered with a non-2xx status.
    #[error("control plane answered {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] std::io::Error),

    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body parsed but carried no usable `token` field.
    #[error("response carries no registration token")]
    MissingToken,
}
