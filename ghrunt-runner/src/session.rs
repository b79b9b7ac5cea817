//! The runner registration as a scoped resource.
//!
//! `AgentController::configure` acquires it, `RunnerSession::deregister`
//! releases it. A session dropped while still registered removes itself in
//! `Drop`, so every path out of the scope (early return, panic unwind)
//! attempts the removal exactly once.

use std::fmt;
use std::future::Future;

use ghrunt_core::{RegistrationTarget, RegistrationToken, RunConfig, RunnerName};

use crate::agent::{Agent, RunResult};
use crate::error::AgentError;

/// Lifecycle of this process's one registration.
///
/// ```text
/// Unconfigured → Configured → Executing → Executed | Failed
///                    └───────────┴────────────┴───────┴──→ Deregistered
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Executing,
    Executed,
    Failed,
    Deregistered,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Unconfigured, Configured)
                | (Configured, Executing)
                | (Executing, Executed)
                | (Executing, Failed)
                | (Configured | Executing | Executed | Failed, Deregistered)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configured => "configured",
            SessionState::Executing => "executing",
            SessionState::Executed => "executed",
            SessionState::Failed => "failed",
            SessionState::Deregistered => "deregistered",
        };
        f.write_str(name)
    }
}

/// Owns the agent and the one session it may ever create.
pub struct AgentController<A: Agent> {
    agent: A,
    state: SessionState,
}

impl<A: Agent> AgentController<A> {
    pub fn new(agent: A) -> Self {
        Self {
            agent,
            state: SessionState::Unconfigured,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) -> Result<(), AgentError> {
        if !self.state.can_transition_to(next) {
            return Err(AgentError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = %self.state, to = %next, "runner session transition");
        self.state = next;
        Ok(())
    }

    /// Register the agent. On success the returned session must be
    /// deregistered (or dropped, which deregisters).
    ///
    /// Fails without side effects on the state when the agent refuses the
    /// registration: no session exists, nothing needs removing.
    pub fn configure(
        &mut self,
        config: &RunConfig,
        token: RegistrationToken,
    ) -> Result<RunnerSession<'_, A>, AgentError> {
        if !self.state.can_transition_to(SessionState::Configured) {
            return Err(AgentError::InvalidTransition {
                from: self.state,
                to: SessionState::Configured,
            });
        }
        self.agent.configure(config, &token)?;
        self.advance(SessionState::Configured)?;

        Ok(RunnerSession {
            controller: self,
            token,
            name: config.name.clone(),
            target: config.target.clone(),
        })
    }
}

/// A live registration on the control plane.
pub struct RunnerSession<'a, A: Agent> {
    controller: &'a mut AgentController<A>,
    token: RegistrationToken,
    name: RunnerName,
    target: RegistrationTarget,
}

impl<A: Agent> RunnerSession<'_, A> {
    pub fn state(&self) -> SessionState {
        self.controller.state
    }

    pub fn name(&self) -> &RunnerName {
        &self.name
    }

    pub fn target(&self) -> &RegistrationTarget {
        &self.target
    }

    /// Run the agent's job loop to completion, or until `shutdown` resolves.
    ///
    /// A failing agent is reported as [`RunResult::Failed`]; `Err` only for
    /// a second call on the same session.
    pub async fn run<S>(&mut self, shutdown: S) -> Result<RunResult, AgentError>
    where
        S: Future<Output = i32>,
    {
        self.controller.advance(SessionState::Executing)?;

        let result = match self.controller.agent.run(shutdown).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "agent could not be started");
                RunResult::Failed { code: None }
            }
        };

        let next = if result.is_success() {
            SessionState::Executed
        } else {
            SessionState::Failed
        };
        self.controller.advance(next)?;
        Ok(result)
    }

    /// Remove the registration. The attempt itself ends the session, whatever
    /// its result.
    pub fn deregister(mut self) -> Result<(), AgentError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), AgentError> {
        let result = self.controller.agent.remove(&self.token);
        self.controller.state = SessionState::Deregistered;
        result
    }
}

impl<A: Agent> Drop for RunnerSession<'_, A> {
    fn drop(&mut self) {
        if self.controller.state == SessionState::Deregistered {
            return;
        }
        tracing::warn!(
            runner = %self.name,
            registry = %self.target,
            state = %self.controller.state,
            "runner session dropped while registered; removing"
        );
        if let Err(err) = self.release() {
            tracing::error!(error = %err, "removal on drop failed");
        }
    }
}
