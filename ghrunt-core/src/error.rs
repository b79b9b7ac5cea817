//! Error types for ghrunt-core.

use thiserror::Error;

/// Everything that can be wrong with the operator-supplied input.
///
/// All variants are reported before any network or process activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The label list was empty after splitting and trimming.
    #[error("at least one runner label is required")]
    NoLabels,

    #[error("invalid runner label '{label}': labels may not contain whitespace")]
    InvalidLabel { label: String },

    #[error("runner name must not be empty")]
    EmptyName,

    #[error("invalid runner name '{name}': names may not contain whitespace")]
    InvalidName { name: String },

    /// Never carries the credential itself.
    #[error("access credential must not be empty")]
    EmptyCredential,

    #[error("invalid registration target '{target}': {reason}")]
    InvalidTarget { target: String, reason: &'static str },

    #[error("invalid {field} '{url}': expected an http:// or https:// URL")]
    InvalidUrl { field: &'static str, url: String },
}
