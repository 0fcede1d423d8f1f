//! Mock process launcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::process::{CommandSpec, ExitOutcome, ProcessError, ProcessHandle, ProcessLauncher};

/// First pid handed out by the mock.
const FIRST_PID: u32 = 1000;

/// Signal number recorded when a mock process is terminated.
pub const MOCK_SIGTERM: i32 = 15;

/// What a launched mock process does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchBehavior {
    /// Keeps running until [`MockProcessLauncher::finish`] or terminate.
    Running,
    /// Has already exited by the time anyone looks at it.
    Exit {
        outcome: ExitOutcome,
        stderr: Vec<String>,
    },
}

impl LaunchBehavior {
    /// Process that exits at once with `code`.
    pub fn exit(code: i32) -> Self {
        LaunchBehavior::Exit {
            outcome: ExitOutcome::from_code(code),
            stderr: Vec::new(),
        }
    }

    /// Process that exits at once with `code` after writing `lines` to stderr.
    pub fn exit_with_stderr(code: i32, lines: &[&str]) -> Self {
        LaunchBehavior::Exit {
            outcome: ExitOutcome::from_code(code),
            stderr: lines.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// A recorded launch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    /// Pid assigned to the launch, `None` if it failed.
    pub pid: Option<u32>,
    pub command: CommandSpec,
}

impl RecordedLaunch {
    /// The output file passed via `--output`, or the last argument otherwise.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.command
            .arg_after("--output")
            .or_else(|| self.command.args.last().map(String::as_str))
            .map(PathBuf::from)
    }
}

#[derive(Debug, Default)]
struct MockProcessState {
    outcome: Option<ExitOutcome>,
    terminated: bool,
    fail_poll: bool,
    stderr: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    next_pid: u32,
    processes: HashMap<u32, MockProcessState>,
    launches: Vec<RecordedLaunch>,
    scripted: VecDeque<LaunchBehavior>,
    next_error: Option<ProcessError>,
    missing_programs: HashSet<PathBuf>,
}

impl Inner {
    fn allocate_pid(&mut self) -> u32 {
        if self.next_pid == 0 {
            self.next_pid = FIRST_PID;
        }
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }
}

/// Mock implementation of the ProcessLauncher trait.
///
/// Provides controllable behavior for testing:
/// - Track launched commands for assertions
/// - Script how each launch behaves
/// - End processes on demand
/// - Simulate launch and poll failures
///
/// # Example
///
/// ```rust,ignore
/// let launcher = MockProcessLauncher::new();
/// launcher.script(LaunchBehavior::exit(1));
///
/// let handle = launcher.launch(&command).await?;
/// assert_eq!(launcher.launch_count(), 1);
///
/// // Later, end a running process
/// launcher.finish(pid, ExitOutcome::from_code(0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProcessLauncher {
    inner: Arc<Mutex<Inner>>,
}

impl MockProcessLauncher {
    /// Create a new mock launcher.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the behavior of the next launch. Unscripted launches keep running.
    pub fn script(&self, behavior: LaunchBehavior) {
        self.lock().scripted.push_back(behavior);
    }

    /// Make the next launch fail with `error`.
    pub fn fail_next(&self, error: ProcessError) {
        self.lock().next_error = Some(error);
    }

    /// Make `validate` report `program` as not installed.
    pub fn set_missing_program(&self, program: impl Into<PathBuf>) {
        self.lock().missing_programs.insert(program.into());
    }

    /// End a running process with `outcome`.
    pub fn finish(&self, pid: u32, outcome: ExitOutcome) {
        if let Some(process) = self.lock().processes.get_mut(&pid) {
            process.outcome.get_or_insert(outcome);
        }
    }

    /// Make every future exit poll of `pid` fail.
    pub fn fail_poll(&self, pid: u32) {
        if let Some(process) = self.lock().processes.get_mut(&pid) {
            process.fail_poll = true;
        }
    }

    /// Whether `terminate` was called on a still running `pid`.
    pub fn was_terminated(&self, pid: u32) -> bool {
        self.lock()
            .processes
            .get(&pid)
            .is_some_and(|p| p.terminated)
    }

    /// Whether `pid` has not exited yet.
    pub fn is_running(&self, pid: u32) -> bool {
        self.lock()
            .processes
            .get(&pid)
            .is_some_and(|p| p.outcome.is_none())
    }

    /// Get all recorded launches.
    pub fn launches(&self) -> Vec<RecordedLaunch> {
        self.lock().launches.clone()
    }

    /// Launches whose program is `program`.
    pub fn launches_of(&self, program: impl AsRef<Path>) -> Vec<RecordedLaunch> {
        let program = program.as_ref();
        self.lock()
            .launches
            .iter()
            .filter(|l| l.command.program == program)
            .cloned()
            .collect()
    }

    pub fn launch_count(&self) -> usize {
        self.lock().launches.len()
    }

    pub fn last_launch(&self) -> Option<RecordedLaunch> {
        self.lock().launches.last().cloned()
    }

    /// A running handle that was never launched, for building tasks directly.
    pub fn spawn_running(&self) -> Box<dyn ProcessHandle> {
        let pid = self.lock().allocate_pid();
        self.spawn_running_with_pid(pid)
    }

    /// Like [`spawn_running`](Self::spawn_running) but with a chosen pid.
    pub fn spawn_running_with_pid(&self, pid: u32) -> Box<dyn ProcessHandle> {
        self.lock()
            .processes
            .insert(pid, MockProcessState::default());
        Box::new(MockProcessHandle {
            pid,
            inner: Arc::clone(&self.inner),
        })
    }
}

#[async_trait]
impl ProcessLauncher for MockProcessLauncher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn launch(&self, command: &CommandSpec) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let mut inner = self.lock();

        if let Some(error) = inner.next_error.take() {
            inner.launches.push(RecordedLaunch {
                pid: None,
                command: command.clone(),
            });
            return Err(error);
        }

        let pid = inner.allocate_pid();
        let state = match inner.scripted.pop_front().unwrap_or(LaunchBehavior::Running) {
            LaunchBehavior::Running => MockProcessState::default(),
            LaunchBehavior::Exit { outcome, stderr } => MockProcessState {
                outcome: Some(outcome),
                stderr,
                ..Default::default()
            },
        };
        inner.processes.insert(pid, state);
        inner.launches.push(RecordedLaunch {
            pid: Some(pid),
            command: command.clone(),
        });

        Ok(Box::new(MockProcessHandle {
            pid,
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn validate(&self, program: &Path, _version_arg: &str) -> Result<(), ProcessError> {
        if self.lock().missing_programs.contains(program) {
            return Err(ProcessError::ProgramNotFound {
                path: program.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Handle returned by [`MockProcessLauncher`].
#[derive(Debug)]
pub struct MockProcessHandle {
    pid: u32,
    inner: Arc<Mutex<Inner>>,
}

impl MockProcessHandle {
    fn with_state<T>(&self, f: impl FnOnce(&mut MockProcessState) -> T) -> Option<T> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.processes.get_mut(&self.pid).map(f)
    }
}

#[async_trait]
impl ProcessHandle for MockProcessHandle {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_exit(&mut self) -> Result<Option<ExitOutcome>, ProcessError> {
        let polled = self.with_state(|p| (p.fail_poll, p.outcome));
        match polled {
            Some((false, outcome)) => Ok(outcome),
            Some((true, _)) | None => Err(ProcessError::Io(std::io::Error::other(format!(
                "no child process {}",
                self.pid
            )))),
        }
    }

    async fn wait_timeout(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<ExitOutcome>, ProcessError> {
        self.try_exit()
    }

    fn terminate(&mut self) -> Result<(), ProcessError> {
        self.with_state(|p| {
            if p.outcome.is_none() {
                p.terminated = true;
                p.outcome = Some(ExitOutcome::from_signal(MOCK_SIGTERM));
            }
        });
        Ok(())
    }

    fn stderr_tail(&self) -> Vec<String> {
        self.with_state(|p| p.stderr.clone()).unwrap_or_default()
    }
}
