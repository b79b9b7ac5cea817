//! Domain types for a single ephemeral runner registration.
//!
//! Secrets (`Secret`, `RegistrationToken`) never render their value through
//! `Debug` or `Display`; the only way to read them is [`Secret::expose`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// A secret string that redacts itself in every formatted output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub const REDACTED: &'static str = "***";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Only for handing the secret to the network or the agent.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&Self::REDACTED).finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::REDACTED)
    }
}

/// Short-lived registration token handed out by the control plane.
///
/// Scoped to exactly one registration target, held in memory for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationToken {
    secret: Secret,
    expires_at: Option<DateTime<Utc>>,
}

impl RegistrationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            secret: Secret::new(value),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn expose(&self) -> &str {
        self.secret.expose()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Unique identity of this runner on the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunnerName(String);

impl RunnerName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RunnerName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidName {
                name: name.to_owned(),
            });
        }
        Ok(Self(name.to_owned()))
    }
}

impl fmt::Display for RunnerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The set of labels attached to the runner. Ordered so the agent sees a
/// stable argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Labels(BTreeSet<String>);

impl Labels {
    /// Comma-joined form expected by the agent's `--labels` option.
    pub fn to_csv(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    }
}

impl FromStr for Labels {
    type Err = ConfigError;

    /// Splits on `,`, trims, drops empty entries and duplicates.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut labels = BTreeSet::new();
        for label in s.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            if label.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidLabel {
                    label: label.to_owned(),
                });
            }
            labels.insert(label.to_owned());
        }
        if labels.is_empty() {
            return Err(ConfigError::NoLabels);
        }
        Ok(Self(labels))
    }
}

// ---------------------------------------------------------------------------
// Registration target
// ---------------------------------------------------------------------------

/// Where the runner registers: a whole organization or a single repository.
///
/// Parsed from `owner` or `owner/repo`; the shape decides which control-plane
/// endpoint issues the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistrationTarget {
    Organization { owner: String },
    Repository { owner: String, repo: String },
}

impl RegistrationTarget {
    /// API path prefix: `orgs/{owner}` or `repos/{owner}/{repo}`.
    pub fn api_path(&self) -> String {
        match self {
            RegistrationTarget::Organization { owner } => format!("orgs/{owner}"),
            RegistrationTarget::Repository { owner, repo } => format!("repos/{owner}/{repo}"),
        }
    }
}

impl FromStr for RegistrationTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ConfigError::InvalidTarget {
            target: s.to_owned(),
            reason,
        };

        let mut segments = s.split('/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next();
        if segments.next().is_some() {
            return Err(invalid("expected 'owner' or 'owner/repo'"));
        }

        check_segment(owner).map_err(invalid)?;
        match repo {
            None => Ok(Self::Organization {
                owner: owner.to_owned(),
            }),
            Some(repo) => {
                check_segment(repo).map_err(invalid)?;
                Ok(Self::Repository {
                    owner: owner.to_owned(),
                    repo: repo.to_owned(),
                })
            }
        }
    }
}

fn check_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("owner and repository must not be empty");
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !segment.chars().all(allowed) {
        return Err("only ASCII letters, digits, '-', '_' and '.' are allowed");
    }
    Ok(())
}

impl fmt::Display for RegistrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationTarget::Organization { owner } => write!(f, "{owner}"),
            RegistrationTarget::Repository { owner, repo } => write!(f, "{owner}/{repo}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Where the agent lives and which control plane it talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Directory holding the agent's `config.sh` and `run.sh`.
    pub agent_dir: PathBuf,
    /// Job working directory handed to the agent's `--work` option.
    pub work_dir: PathBuf,
    /// Control-plane REST API base, no trailing slash.
    pub api_url: String,
    /// Web base the registration URL is built on, no trailing slash.
    pub server_url: String,
}

impl AgentSettings {
    /// `{server_url}/{target}`, the URL the agent registers against.
    pub fn registration_url(&self, target: &RegistrationTarget) -> String {
        format!("{}/{target}", self.server_url)
    }
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub labels: Labels,
    pub name: RunnerName,
    pub access_credential: Secret,
    pub target: RegistrationTarget,
    pub agent: AgentSettings,
    /// Escalate a failed deregistration to a non-zero exit.
    pub strict_deregister: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
