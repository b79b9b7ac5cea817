use std::path::PathBuf;

use thiserror::Error;

use crate::agent::Procedure;
use crate::session::SessionState;

/// Failures of the external agent or of the session state machine.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent {procedure} could not be started ({}): {source}", .program.display())]
    Spawn {
        procedure: Procedure,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent {procedure} exited unsuccessfully ({})", describe_code(.code))]
    Exit {
        procedure: Procedure,
        code: Option<i32>,
    },

    #[error("runner session cannot move from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

/// Orchestrator setup failures, before any phase ran.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
