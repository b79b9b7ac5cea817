//! Runner lifecycle: agent controller and run orchestrator.
//!
//! [`AgentController`] and [`RunnerSession`] own the configure → run →
//! deregister sequence; [`runtime::run`] sequences token acquisition and the
//! session and turns the outcome into a [`RunReport`].

pub mod agent;
mod error;
pub mod runtime;
pub mod session;
pub mod signal;

#[cfg(test)]
mod fake;

pub use agent::{Agent, Procedure, RunResult, ScriptAgent};
pub use error::{AgentError, RunnerError};
pub use runtime::{init_tracing, run, start_blocking, Outcome, RunReport};
pub use session::{AgentController, RunnerSession, SessionState};
pub use signal::Shutdown;
