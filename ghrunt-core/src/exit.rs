//! Process exit codes.
//!
//! The failing phase is identifiable from the code alone; the log output
//! carries the details.

/// Configure, run and deregister all succeeded.
pub const SUCCESS: u8 = 0;

/// The orchestrator could not set itself up (async runtime, signal handlers).
pub const SETUP: u8 = 1;

/// Invalid input. Matches clap's own usage-error code.
pub const CONFIG: u8 = 2;

/// The control plane did not hand out a registration token.
pub const CREDENTIAL: u8 = 3;

/// The agent refused the registration.
pub const CONFIGURE: u8 = 4;

/// The agent ran and reported failure, or could not be started.
pub const RUN: u8 = 5;

/// Deregistration failed under `--strict-deregister`.
pub const DEREGISTER: u8 = 6;

/// Conventional `128 + N` code for termination by signal `N`.
pub fn signal(signo: i32) -> u8 {
    u8::try_from(128 + signo.clamp(0, 127)).unwrap_or(u8::MAX)
}
