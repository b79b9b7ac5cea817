use std::future::Future;

use tracing::{error, info, warn};

use ghrunt_core::{exit, RunConfig};
use ghrunt_token::{CredentialError, GitHubTokenClient, TokenSource};

use crate::agent::{Agent, RunResult, ScriptAgent};
use crate::error::{AgentError, RunnerError};
use crate::session::AgentController;
use crate::signal::Shutdown;

/// Where a run ended up.
#[derive(Debug)]
pub enum Outcome {
    /// No token, nothing registered.
    CredentialFailed(CredentialError),
    /// The agent refused the registration; nothing to remove.
    ConfigureFailed(AgentError),
    /// A session existed and its removal was attempted.
    Completed {
        run: RunResult,
        deregister: Result<(), AgentError>,
    },
}

/// Result of one full lifecycle.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    pub strict_deregister: bool,
}

impl RunReport {
    /// Process exit code for this report.
    ///
    /// The earliest failing phase decides. A failed removal only counts when
    /// `strict_deregister` is set and the run itself succeeded.
    pub fn exit_code(&self) -> u8 {
        match &self.outcome {
            Outcome::CredentialFailed(_) => exit::CREDENTIAL,
            Outcome::ConfigureFailed(_) => exit::CONFIGURE,
            Outcome::Completed { run, deregister } => match run {
                RunResult::Failed { .. } => exit::RUN,
                RunResult::Interrupted { signal } => exit::signal(*signal),
                RunResult::Succeeded if deregister.is_err() && self.strict_deregister => {
                    exit::DEREGISTER
                }
                RunResult::Succeeded => exit::SUCCESS,
            },
        }
    }

    pub fn deregister_attempted(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }
}

/// Build a single-threaded runtime, install signal handlers, and run the
/// full lifecycle against GitHub and the agent scripts in `agent_dir`.
///
/// Blocks the current thread until the registration has been removed.
pub fn start_blocking(config: &RunConfig) -> Result<RunReport, RunnerError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(RunnerError::Runtime)?;

    runtime.block_on(async {
        let mut shutdown = Shutdown::install()?;
        let tokens = GitHubTokenClient::new(config.agent.api_url.clone());
        let agent = ScriptAgent::new(config.agent.agent_dir.clone());
        Ok::<_, RunnerError>(run(config, &tokens, agent, shutdown.recv()).await)
    })
}

/// Acquire a token, configure, run, and always deregister after a successful
/// configure.
///
/// `shutdown` resolves with a signal number when the process is asked to
/// stop; it is only observed while the agent runs. A signal that arrived
/// earlier is still pending on [`Shutdown`](crate::Shutdown) and stops the
/// agent as soon as it starts.
pub async fn run<T, A, S>(config: &RunConfig, tokens: &T, agent: A, shutdown: S) -> RunReport
where
    T: TokenSource,
    A: Agent,
    S: Future<Output = i32>,
{
    let report = |outcome| RunReport {
        outcome,
        strict_deregister: config.strict_deregister,
    };

    info!(registry = %config.target, "acquiring registration token");
    let token = match tokens.acquire_token(&config.access_credential, &config.target) {
        Ok(token) => token,
        Err(err) => {
            error!(phase = "token", error = %err, "failed to acquire registration token");
            return report(Outcome::CredentialFailed(err));
        }
    };
    info!(expires_at = ?token.expires_at(), "registration token acquired");

    let mut controller = AgentController::new(agent);
    info!(
        runner = %config.name,
        labels = %config.labels.to_csv(),
        url = %config.agent.registration_url(&config.target),
        "configuring runner"
    );
    let mut session = match controller.configure(config, token) {
        Ok(session) => session,
        Err(err) => {
            error!(phase = "configure", error = %err, "runner configuration failed");
            return report(Outcome::ConfigureFailed(err));
        }
    };
    info!(runner = %session.name(), registry = %session.target(), "runner configured");

    info!("executing runner");
    let run = match session.run(shutdown).await {
        Ok(result) => result,
        Err(err) => {
            error!(phase = "run", error = %err, "runner session rejected run");
            RunResult::Failed { code: None }
        }
    };
    match run {
        RunResult::Succeeded => info!("runner finished"),
        RunResult::Failed { code } => error!(phase = "run", ?code, "runner failed"),
        RunResult::Interrupted { signal } => warn!(phase = "run", signal, "runner interrupted"),
    }

    info!("removing runner");
    let deregister = session.deregister();
    match &deregister {
        Ok(()) => info!("runner removed"),
        Err(err) => error!(phase = "deregister", error = %err, "runner removal failed"),
    }

    let report = report(Outcome::Completed { run, deregister });
    info!(exit_code = report.exit_code(), "done");
    report
}

/// Human-readable `fmt` subscriber on stderr, filtered by `RUST_LOG`.
///
/// The HTTP client is capped at `warn`: its trace output includes request
/// headers, and those carry the access credential.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Ok(directive) = "ureq=warn".parse() {
        filter = filter.add_directive(directive);
    }
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
