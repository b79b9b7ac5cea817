use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::Duration;

use ghrunt_core::{RegistrationToken, RunConfig, Secret};

use crate::error::AgentError;

/// Script that registers (and, with `remove`, deregisters) the agent.
pub const CONFIG_SCRIPT: &str = "config.sh";
/// Script that runs the agent's job loop in the foreground.
pub const RUN_SCRIPT: &str = "run.sh";

/// How long an interrupted agent gets to exit after SIGTERM before its
/// process group is killed.
pub const STOP_GRACE: Duration = Duration::from_secs(15);

/// The three procedures of the external agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    Configure,
    Run,
    Remove,
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Configure => write!(f, "configure"),
            Procedure::Run => write!(f, "run"),
            Procedure::Remove => write!(f, "remove"),
        }
    }
}

/// How the run phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Succeeded,
    /// Non-zero exit, death by signal (`code: None`) or failure to start.
    Failed { code: Option<i32> },
    /// This process received `signal` while the agent was running.
    Interrupted { signal: i32 },
}

impl RunResult {
    pub fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            RunResult::Succeeded
        } else {
            RunResult::Failed {
                code: status.code(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Succeeded)
    }
}

/// The external agent, one method per procedure.
///
/// `configure` and `remove` are short and run synchronously; `run` is the
/// only long-blocking step and is awaited so termination signals can
/// preempt it.
#[allow(async_fn_in_trait)]
pub trait Agent {
    fn configure(&self, config: &RunConfig, token: &RegistrationToken) -> Result<(), AgentError>;

    /// Run the job loop until it exits or `shutdown` resolves with a signal
    /// number. In the latter case the agent is stopped and reaped before this
    /// returns [`RunResult::Interrupted`].
    ///
    /// A non-zero exit is a [`RunResult::Failed`], not an error. `Err` means
    /// the agent never ran.
    async fn run<S>(&self, shutdown: S) -> Result<RunResult, AgentError>
    where
        S: Future<Output = i32>;

    fn remove(&self, token: &RegistrationToken) -> Result<(), AgentError>;
}

/// Drives the GitHub Actions runner scripts shipped in `dir`.
#[derive(Debug, Clone)]
pub struct ScriptAgent {
    dir: PathBuf,
}

impl ScriptAgent {
    /// A relative `dir` is anchored at the current directory so the script
    /// paths stay valid whatever working directory the children get.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = if dir.is_relative() {
            std::env::current_dir()
                .map(|cwd| cwd.join(&dir))
                .unwrap_or(dir)
        } else {
            dir
        };
        Self { dir }
    }

    /// Arguments for `config.sh` registration.
    pub fn configure_args(config: &RunConfig, token: &RegistrationToken) -> Vec<String> {
        vec![
            "--labels".to_string(),
            config.labels.to_csv(),
            "--name".to_string(),
            config.name.to_string(),
            "--replace".to_string(),
            "--token".to_string(),
            token.expose().to_string(),
            "--unattended".to_string(),
            "--url".to_string(),
            config.agent.registration_url(&config.target),
            "--work".to_string(),
            config.agent.work_dir.display().to_string(),
        ]
    }

    /// Arguments for `config.sh` removal.
    pub fn remove_args(token: &RegistrationToken) -> Vec<String> {
        vec![
            "remove".to_string(),
            "--token".to_string(),
            token.expose().to_string(),
        ]
    }

    fn script(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn invoke(
        &self,
        procedure: Procedure,
        script: &str,
        args: &[String],
        secret: &Secret,
    ) -> Result<(), AgentError> {
        let program = self.script(script);
        tracing::debug!(
            program = %program.display(),
            args = %redact(args, secret).join(" "),
            "invoking agent {procedure}"
        );

        let status = Command::new(&program)
            .args(args)
            .current_dir(&self.dir)
            .status()
            .map_err(|source| AgentError::Spawn {
                procedure,
                program: program.clone(),
                source,
            })?;

        if status.success() {
            return Ok(());
        }
        Err(AgentError::Exit {
            procedure,
            code: status.code(),
        })
    }
}

impl Agent for ScriptAgent {
    fn configure(&self, config: &RunConfig, token: &RegistrationToken) -> Result<(), AgentError> {
        let args = Self::configure_args(config, token);
        self.invoke(Procedure::Configure, CONFIG_SCRIPT, &args, token.secret())
    }

    async fn run<S>(&self, shutdown: S) -> Result<RunResult, AgentError>
    where
        S: Future<Output = i32>,
    {
        let program = self.script(RUN_SCRIPT);
        tracing::debug!(program = %program.display(), "invoking agent run");

        let mut command = tokio::process::Command::new(&program);
        command.current_dir(&self.dir).kill_on_drop(true);
        // Own process group, so the listener processes run.sh starts can be
        // signalled together with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| AgentError::Spawn {
            procedure: Procedure::Run,
            program: program.clone(),
            source,
        })?;

        tokio::pin!(shutdown);
        let status = tokio::select! {
            status = child.wait() => status,
            signal = &mut shutdown => {
                tracing::warn!(signal, "termination signal received; stopping agent");
                stop(&mut child).await;
                return Ok(RunResult::Interrupted { signal });
            }
        };

        let status = status.map_err(|source| AgentError::Spawn {
            procedure: Procedure::Run,
            program,
            source,
        })?;
        Ok(RunResult::from_status(status))
    }

    fn remove(&self, token: &RegistrationToken) -> Result<(), AgentError> {
        let args = Self::remove_args(token);
        self.invoke(Procedure::Remove, CONFIG_SCRIPT, &args, token.secret())
    }
}

/// SIGTERM the agent's process group, give it [`STOP_GRACE`] to exit, then
/// SIGKILL whatever is left of the group. Returns once `run.sh` is reaped.
#[cfg(unix)]
async fn stop(child: &mut tokio::process::Child) {
    let Some(group) = child.id() else {
        return;
    };

    signal_group(group, libc::SIGTERM);
    let exited = tokio::time::timeout(STOP_GRACE, child.wait()).await;
    signal_group(group, libc::SIGKILL);

    match exited {
        Ok(Ok(status)) => tracing::debug!(%status, "agent stopped"),
        Ok(Err(err)) => tracing::warn!(error = %err, "waiting for agent failed"),
        Err(_) => {
            tracing::warn!(grace = ?STOP_GRACE, "agent ignored SIGTERM; killed");
            if let Err(err) = child.wait().await {
                tracing::warn!(error = %err, "reaping agent failed");
            }
        }
    }
}

#[cfg(not(unix))]
async fn stop(child: &mut tokio::process::Child) {
    if let Err(err) = child.kill().await {
        tracing::warn!(error = %err, "killing agent failed");
    }
}

#[cfg(unix)]
fn signal_group(group: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(group) else {
        return;
    };
    // SAFETY: killpg only delivers a signal; `pgid` is the group created for
    // the agent by `process_group(0)`.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: the group is already empty.
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(error = %err, signal, "signalling agent process group failed");
        }
    }
}

/// Copy of `args` with every occurrence of `secret` masked.
pub fn redact(args: &[String], secret: &Secret) -> Vec<String> {
    args.iter()
        .map(|arg| {
            if !secret.is_empty() && arg.contains(secret.expose()) {
                arg.replace(secret.expose(), Secret::REDACTED)
            } else {
                arg.clone()
            }
        })
        .collect()
}
