//! Trait definitions for the process module.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::error::ProcessError;
use super::types::{CommandSpec, ExitOutcome};

/// A running (or finished) external process owned by exactly one task.
///
/// Dropping the bare handle leaves the process running; the owning
/// [`Task`](crate::task::Task) terminates it on drop.
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS process id captured at spawn time.
    ///
    /// Only meaningful while the owning task is alive; the OS reuses ids.
    fn id(&self) -> u32;

    /// Non-blocking exit check. `Ok(None)` means still running.
    fn try_exit(&mut self) -> Result<Option<ExitOutcome>, ProcessError>;

    /// Waits for the process to exit for at most `timeout`.
    ///
    /// Returns `Ok(None)` if it is still running when the timeout elapses.
    async fn wait_timeout(&mut self, timeout: Duration)
        -> Result<Option<ExitOutcome>, ProcessError>;

    /// Asks the process to stop (SIGTERM on Unix). Does not wait.
    fn terminate(&mut self) -> Result<(), ProcessError>;

    /// Last lines the process wrote to stderr.
    fn stderr_tail(&self) -> Vec<String>;
}

/// Starts external programs.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Returns the name of this launcher implementation.
    fn name(&self) -> &str;

    /// Starts `command` without waiting for it.
    async fn launch(&self, command: &CommandSpec) -> Result<Box<dyn ProcessHandle>, ProcessError>;

    /// Checks that `program` can be executed by running it with `version_arg`.
    async fn validate(&self, program: &Path, version_arg: &str) -> Result<(), ProcessError>;
}
