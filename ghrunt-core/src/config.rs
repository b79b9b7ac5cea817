//! Raw operator input → validated [`RunConfig`].
//!
//! The CLI fills a [`RawConfig`] with plain strings; [`RawConfig::validate`]
//! is the only way to obtain a `RunConfig`.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{AgentSettings, Labels, RegistrationTarget, RunConfig, RunnerName, Secret};

pub const DEFAULT_AGENT_DIR: &str = ".";
pub const DEFAULT_WORK_DIR: &str = "/ghrunt/workdir";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Unvalidated input, one field per CLI option.
#[derive(Debug, Clone)]
pub struct RawConfig {
    pub labels: String,
    pub name: String,
    pub access_credential: Secret,
    pub registry: String,
    pub agent_dir: PathBuf,
    pub work_dir: PathBuf,
    pub api_url: String,
    pub server_url: String,
    pub strict_deregister: bool,
}

impl RawConfig {
    /// Raw config with the four required values and every optional one defaulted.
    pub fn new(
        labels: impl Into<String>,
        name: impl Into<String>,
        access_credential: Secret,
        registry: impl Into<String>,
    ) -> Self {
        Self {
            labels: labels.into(),
            name: name.into(),
            access_credential,
            registry: registry.into(),
            agent_dir: PathBuf::from(DEFAULT_AGENT_DIR),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            api_url: DEFAULT_API_URL.to_owned(),
            server_url: DEFAULT_SERVER_URL.to_owned(),
            strict_deregister: false,
        }
    }

    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        let labels: Labels = self.labels.parse()?;
        let name: RunnerName = self.name.parse()?;
        if self.access_credential.expose().trim().is_empty() {
            return Err(ConfigError::EmptyCredential);
        }
        let target: RegistrationTarget = self.registry.trim().parse()?;

        let agent = AgentSettings {
            agent_dir: self.agent_dir,
            work_dir: self.work_dir,
            api_url: normalize_url("API URL", &self.api_url)?,
            server_url: normalize_url("server URL", &self.server_url)?,
        };

        Ok(RunConfig {
            labels,
            name,
            access_credential: self.access_credential,
            target,
            agent,
            strict_deregister: self.strict_deregister,
        })
    }
}

/// Require an http(s) scheme and strip trailing slashes.
fn normalize_url(field: &'static str, url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    let trimmed = url.trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match host {
        Some(host) if !host.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidUrl {
            field,
            url: url.to_owned(),
        }),
    }
}
