//! Recording in-memory agent for controller and orchestrator tests.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use ghrunt_core::{RegistrationToken, RunConfig};

use crate::agent::{Agent, Procedure, RunResult};
use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Configure { token: String, name: String },
    Run,
    Remove { token: String },
}

impl Call {
    pub(crate) fn configure(token: &str, name: &str) -> Self {
        Call::Configure {
            token: token.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn remove(token: &str) -> Self {
        Call::Remove {
            token: token.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FakeRun {
    Exit(i32),
    SpawnError,
    Hang,
}

/// Clones share the call log, so a test keeps one handle while the other is
/// moved into the code under test.
#[derive(Debug, Clone)]
pub(crate) struct FakeAgent {
    calls: Rc<RefCell<Vec<Call>>>,
    configure_exit: Option<i32>,
    run: FakeRun,
    remove_exit: Option<i32>,
}

impl FakeAgent {
    pub(crate) fn new() -> Self {
        Self {
            calls: Rc::default(),
            configure_exit: None,
            run: FakeRun::Exit(0),
            remove_exit: None,
        }
    }

    pub(crate) fn failing_configure(mut self, code: i32) -> Self {
        self.configure_exit = Some(code);
        self
    }

    pub(crate) fn run_exit(mut self, code: i32) -> Self {
        self.run = FakeRun::Exit(code);
        self
    }

    pub(crate) fn run_spawn_error(mut self) -> Self {
        self.run = FakeRun::SpawnError;
        self
    }

    /// The run phase only ends when shutdown is requested.
    pub(crate) fn hanging_run(mut self) -> Self {
        self.run = FakeRun::Hang;
        self
    }

    pub(crate) fn failing_remove(mut self, code: i32) -> Self {
        self.remove_exit = Some(code);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn configures(&self) -> usize {
        self.count(|c| matches!(c, Call::Configure { .. }))
    }

    pub(crate) fn runs(&self) -> usize {
        self.count(|c| matches!(c, Call::Run))
    }

    pub(crate) fn removals(&self) -> usize {
        self.count(|c| matches!(c, Call::Remove { .. }))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn exit(procedure: Procedure, code: Option<i32>) -> Result<(), AgentError> {
    match code {
        None => Ok(()),
        Some(code) => Err(AgentError::Exit {
            procedure,
            code: Some(code),
        }),
    }
}

impl Agent for FakeAgent {
    fn configure(&self, config: &RunConfig, token: &RegistrationToken) -> Result<(), AgentError> {
        self.record(Call::configure(token.expose(), config.name.as_str()));
        exit(Procedure::Configure, self.configure_exit)
    }

    async fn run<S>(&self, shutdown: S) -> Result<RunResult, AgentError>
    where
        S: Future<Output = i32>,
    {
        self.record(Call::Run);
        match self.run {
            FakeRun::Exit(0) => Ok(RunResult::Succeeded),
            FakeRun::Exit(code) => Ok(RunResult::Failed { code: Some(code) }),
            FakeRun::SpawnError => Err(AgentError::Spawn {
                procedure: Procedure::Run,
                program: "run.sh".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            }),
            FakeRun::Hang => Ok(RunResult::Interrupted {
                signal: shutdown.await,
            }),
        }
    }

    fn remove(&self, token: &RegistrationToken) -> Result<(), AgentError> {
        self.record(Call::remove(token.expose()));
        exit(Procedure::Remove, self.remove_exit)
    }
}
