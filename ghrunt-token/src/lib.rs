//! # ghrunt-token
//!
//! Exchanges a long-lived access credential for a short-lived runner
//! registration token.
//!
//! [`TokenSource`] is the seam the orchestrator depends on;
//! [`GitHubTokenClient`] is the HTTP implementation. Every call is exactly
//! one request: no retries, no caching.

pub mod client;
pub mod error;

pub use client::{endpoint, parse_token_response, GitHubTokenClient, TokenSource};
pub use error::CredentialError;
