//! ghrunt: ephemeral GitHub Actions runner entrypoint.
//!
//! Registers one runner, runs it until its job loop exits, and removes the
//! registration again on every way out.
//!
//! # Usage
//!
//! ```text
//! ghrunt --labels LIST --name STRING --pat TOKEN --registry ORG[/REPO]
//!        [--agent-dir DIR] [--work-dir DIR] [--api-url URL] [--server-url URL]
//!        [--strict-deregister]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use ghrunt_core::config::{
    DEFAULT_AGENT_DIR, DEFAULT_API_URL, DEFAULT_SERVER_URL, DEFAULT_WORK_DIR,
};
use ghrunt_core::{exit, ConfigError, RawConfig, Secret};
use ghrunt_runner::{init_tracing, start_blocking, RunReport};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ghrunt",
    version,
    about = "Register, run and remove one ephemeral GitHub Actions runner",
    long_about = None,
)]
struct Cli {
    /// Additional labels for the runner (comma separated).
    #[arg(long, env = "GHRUNT_LABELS", value_name = "LIST")]
    labels: String,

    /// Unique name of this runner.
    #[arg(long, env = "GHRUNT_NAME", value_name = "STRING")]
    name: String,

    /// Personal access token used to request the registration token.
    #[arg(
        long,
        env = "GHRUNT_PAT",
        value_name = "TOKEN",
        hide_env_values = true,
        value_parser = parse_secret
    )]
    pat: Secret,

    /// Organization or repository to register on.
    #[arg(long, env = "GHRUNT_REGISTRY", value_name = "ORG/REPO")]
    registry: String,

    /// Directory containing the runner's config.sh and run.sh.
    #[arg(long, env = "GHRUNT_AGENT_DIR", value_name = "DIR", default_value = DEFAULT_AGENT_DIR)]
    agent_dir: PathBuf,

    /// Job working directory handed to the runner.
    #[arg(long, env = "GHRUNT_WORK_DIR", value_name = "DIR", default_value = DEFAULT_WORK_DIR)]
    work_dir: PathBuf,

    /// Base URL of the REST API issuing registration tokens.
    #[arg(long, env = "GHRUNT_API_URL", value_name = "URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Base URL the runner registers against.
    #[arg(long, env = "GHRUNT_SERVER_URL", value_name = "URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Exit non-zero when removing the registration fails after a successful run.
    #[arg(
        long,
        env = "GHRUNT_STRICT_DEREGISTER",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    strict_deregister: bool,
}

fn parse_secret(value: &str) -> std::result::Result<Secret, String> {
    Ok(Secret::new(value))
}

impl Cli {
    fn into_raw(self) -> RawConfig {
        RawConfig {
            labels: self.labels,
            name: self.name,
            access_credential: self.pat,
            registry: self.registry,
            agent_dir: self.agent_dir,
            work_dir: self.work_dir,
            api_url: self.api_url,
            server_url: self.server_url,
            strict_deregister: self.strict_deregister,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match execute(cli) {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn execute(cli: Cli) -> Result<RunReport> {
    let config = cli
        .into_raw()
        .validate()
        .context("invalid configuration")?;
    start_blocking(&config).context("runner setup failed")
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        exit::CONFIG
    } else {
        exit::SETUP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn optional_settings_have_defaults() {
        let cli = Cli::try_parse_from([
            "ghrunt",
            "--labels",
            "linux",
            "--name",
            "n1",
            "--pat",
            "pat_x",
            "--registry",
            "octo",
        ])
        .expect("parse");
        let raw = cli.into_raw();
        assert_eq!(raw.api_url, DEFAULT_API_URL);
        assert_eq!(raw.server_url, DEFAULT_SERVER_URL);
        assert_eq!(raw.work_dir, PathBuf::from(DEFAULT_WORK_DIR));
        assert!(!raw.strict_deregister);
    }

    #[test]
    fn strict_deregister_is_a_plain_flag() {
        let cli = Cli::try_parse_from([
            "ghrunt",
            "--labels",
            "linux",
            "--name",
            "n1",
            "--pat",
            "pat_x",
            "--registry",
            "octo",
            "--strict-deregister",
        ])
        .expect("parse");
        assert!(cli.strict_deregister);
    }

    #[test]
    fn debug_output_hides_the_credential() {
        let cli = Cli::try_parse_from([
            "ghrunt",
            "--labels",
            "linux",
            "--name",
            "n1",
            "--pat",
            "pat_supersecret",
            "--registry",
            "octo",
        ])
        .unwrap();
        assert!(!format!("{cli:?}").contains("pat_supersecret"));
    }

    #[test]
    fn config_errors_map_to_config_exit_code() {
        let err = anyhow::Error::new(ConfigError::NoLabels).context("invalid configuration");
        assert_eq!(exit_code_for(&err), exit::CONFIG);
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), exit::SETUP);
    }
}
