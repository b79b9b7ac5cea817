//! ghrunt core library: domain types, configuration validation, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes and the validated [`RunConfig`]
//! - [`config`]: raw input → [`RunConfig`]
//! - [`error`]: [`ConfigError`]
//! - [`exit`]: process exit codes shared by the runner and the CLI

pub mod config;
pub mod error;
pub mod exit;
pub mod types;

pub use config::RawConfig;
pub use error::ConfigError;
pub use types::{
    AgentSettings, Labels, RegistrationTarget, RegistrationToken, RunConfig, RunnerName, Secret,
};
