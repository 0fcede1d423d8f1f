//! tokio::process based launcher implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

use super::error::ProcessError;
use super::traits::{ProcessHandle, ProcessLauncher};
use super::types::{CommandSpec, ExitOutcome};

/// Number of stderr lines kept per process.
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for the stderr reader to drain after exit.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Launcher backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

/// Handle to a child spawned by [`TokioProcessLauncher`].
pub struct TokioProcessHandle {
    pid: u32,
    program: PathBuf,
    child: Child,
    exit: Option<ExitOutcome>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_reader: Option<JoinHandle<()>>,
}

impl TokioProcessHandle {
    /// Keeps the last lines of stderr so a chatty child never blocks on a full pipe.
    fn spawn_stderr_reader(
        child: &mut Child,
        tail: Arc<Mutex<VecDeque<String>>>,
    ) -> Option<JoinHandle<()>> {
        let stderr = child.stderr.take()?;
        Some(tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Ok(mut buf) = tail.lock() {
                    if buf.len() == STDERR_TAIL_LINES {
                        buf.pop_front();
                    }
                    buf.push_back(line);
                }
            }
        }))
    }

    async fn record_exit(&mut self, outcome: ExitOutcome) -> ExitOutcome {
        self.exit = Some(outcome);
        if let Some(reader) = self.stderr_reader.take() {
            let _ = timeout(STDERR_DRAIN_TIMEOUT, reader).await;
        }
        debug!(
            "Process {} ({}) exited: {}",
            self.pid,
            self.program.display(),
            outcome
        );
        outcome
    }
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_exit(&mut self) -> Result<Option<ExitOutcome>, ProcessError> {
        if let Some(outcome) = self.exit {
            return Ok(Some(outcome));
        }
        match self.child.try_wait()? {
            Some(status) => {
                let outcome = ExitOutcome::from(status);
                self.exit = Some(outcome);
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }

    async fn wait_timeout(
        &mut self,
        limit: Duration,
    ) -> Result<Option<ExitOutcome>, ProcessError> {
        if let Some(outcome) = self.exit {
            return Ok(Some(outcome));
        }
        let waited = timeout(limit, self.child.wait()).await;
        match waited {
            Ok(Ok(status)) => Ok(Some(self.record_exit(ExitOutcome::from(status)).await)),
            Ok(Err(e)) => Err(ProcessError::Io(e)),
            Err(_) => Ok(None),
        }
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        // Once reaped the pid may already belong to someone else.
        if self.exit.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            let pid = libc::pid_t::try_from(self.pid).map_err(|_| ProcessError::SignalFailed {
                pid: self.pid,
                reason: "pid out of range".to_string(),
            })?;
            // SAFETY: kill(2) has no memory preconditions; the child is not reaped yet.
            let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
            if rc != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::ESRCH) {
                    return Ok(());
                }
                return Err(ProcessError::SignalFailed {
                    pid: self.pid,
                    reason: err.to_string(),
                });
            }
            Ok(())
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill().map_err(ProcessError::Io)
        }
    }

    fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail
            .lock()
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    fn name(&self) -> &str {
        "tokio"
    }

    async fn launch(&self, command: &CommandSpec) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessError::from_spawn(&command.program, e))?;

        let pid = child.id().ok_or_else(|| ProcessError::MissingPid {
            program: command.program.clone(),
        })?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stderr_reader =
            TokioProcessHandle::spawn_stderr_reader(&mut child, Arc::clone(&stderr_tail));

        debug!("Spawned process {}: {}", pid, command);

        Ok(Box::new(TokioProcessHandle {
            pid,
            program: command.program.clone(),
            child,
            exit: None,
            stderr_tail,
            stderr_reader,
        }))
    }

    async fn validate(&self, program: &Path, version_arg: &str) -> Result<(), ProcessError> {
        Command::new(program)
            .arg(version_arg)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProcessError::from_spawn(program, e))?;
        Ok(())
    }
}
