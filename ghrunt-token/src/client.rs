//! Control-plane client for runner registration tokens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use ghrunt_core::{RegistrationTarget, RegistrationToken, Secret};

use crate::error::CredentialError;

pub const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("ghrunt/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Anything that can turn an access credential into a registration token.
pub trait TokenSource {
    fn acquire_token(
        &self,
        access_credential: &Secret,
        target: &RegistrationTarget,
    ) -> Result<RegistrationToken, CredentialError>;
}

/// Registration-token endpoint for `target` under `api_url`.
///
/// Pure function of the target shape: `owner` selects the organization
/// endpoint, `owner/repo` the repository endpoint.
pub fn endpoint(api_url: &str, target: &RegistrationTarget) -> String {
    format!(
        "{}/{}/actions/runners/registration-token",
        api_url.trim_end_matches('/'),
        target.api_path()
    )
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Extract the token from a 2xx response body.
pub fn parse_token_response(body: &str) -> Result<RegistrationToken, CredentialError> {
    let response: TokenResponse = serde_json::from_str(body)?;
    let token = response
        .token
        .filter(|t| !t.is_empty())
        .ok_or(CredentialError::MissingToken)?;

    let mut token = RegistrationToken::new(token);
    if let Some(expiry) = response.expires_at.as_deref().and_then(parse_expiry) {
        token = token.with_expiry(expiry);
    }
    Ok(token)
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// `message` from a GitHub-style error body, else the body itself.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.message,
        Err(_) => {
            let body = body.trim();
            if body.is_empty() {
                "<empty body>".to_string()
            } else {
                body.chars().take(200).collect()
            }
        }
    }
}

/// Blocking HTTP client against the GitHub REST API (or a compatible one).
pub struct GitHubTokenClient {
    api_url: String,
    agent: ureq::Agent,
}

impl GitHubTokenClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            api_url: api_url.into(),
            agent,
        }
    }
}

impl TokenSource for GitHubTokenClient {
    fn acquire_token(
        &self,
        access_credential: &Secret,
        target: &RegistrationTarget,
    ) -> Result<RegistrationToken, CredentialError> {
        let url = endpoint(&self.api_url, target);
        tracing::debug!(url = %url, "requesting registration token");

        let result = self
            .agent
            .post(&url)
            .set("Accept", ACCEPT)
            .set("User-Agent", USER_AGENT)
            .set(
                "Authorization",
                &format!("token {}", access_credential.expose()),
            )
            .send_bytes(&[]);

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(CredentialError::Status {
                    url,
                    status,
                    message: error_message(&body),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(CredentialError::Transport {
                    url,
                    source: Box::new(transport),
                });
            }
        };

        let status = response.status();
        let body = response.into_string()?;
        let token = parse_token_response(&body)?;
        tracing::debug!(
            status,
            expires_at = ?token.expires_at(),
            "registration token received"
        );
        Ok(token)
    }
}
