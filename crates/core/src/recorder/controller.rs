//! The cycle controller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::CatalogSource;
use crate::probe::FileProbe;
use crate::process::{ExitOutcome, ProcessLauncher};
use crate::task::{Task, TaskKind, TaskStore};

use super::config::RecorderSettings;
use super::types::{CycleReport, RecorderError, RecorderStatus};

/// Drives captures and transcodes, one cycle at a time.
///
/// Owned by a single control task; nothing here is shared.
pub struct Recorder {
    pub(super) settings: RecorderSettings,
    pub(super) catalog: Arc<dyn CatalogSource>,
    pub(super) launcher: Arc<dyn ProcessLauncher>,
    pub(super) probe: Arc<dyn FileProbe>,
    pub(super) tasks: TaskStore,
    pub(super) cycle_count: u64,
}

impl Recorder {
    /// Create a new recorder with an empty task store.
    pub fn new(
        settings: RecorderSettings,
        catalog: Arc<dyn CatalogSource>,
        launcher: Arc<dyn ProcessLauncher>,
        probe: Arc<dyn FileProbe>,
    ) -> Self {
        Self {
            settings,
            catalog,
            launcher,
            probe,
            tasks: TaskStore::new(),
            cycle_count: 0,
        }
    }

    /// Time to sleep between cycles.
    pub fn interval(&self) -> Duration {
        self.settings.recorder.interval()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            cycle_count: self.cycle_count,
            active_captures: self.tasks.capture_count(),
            active_transcodes: self.tasks.transcode_count(),
        }
    }

    /// Runs one reap-then-discover cycle.
    ///
    /// Per-task failures are logged and never abort the cycle. Errors are
    /// limited to the catalog failing and an external program missing.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, RecorderError> {
        self.cycle_count += 1;
        let mut report = CycleReport::new(self.cycle_count);
        debug!(
            "Cycle {} starting with {} task(s)",
            self.cycle_count,
            self.tasks.len()
        );

        let mut ended = self.reap(&mut report).await;

        // Removed before any handler runs, so a new task reusing an ended
        // pid cannot be swept with them.
        let removed = self
            .tasks
            .remove_where(|task| ended.contains_key(&task.process_id()));

        let mut fatal = None;
        for task in removed {
            let outcome = ended
                .remove(&task.process_id())
                .unwrap_or_else(ExitOutcome::unknown);
            if let Err(e) = self.dispatch_ended(&task, outcome, &mut report).await {
                fatal.get_or_insert(e);
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        self.discover(&mut report).await?;

        debug!(
            "Cycle {} done: {} ended, {} stalled, {} started, {} transcoding",
            report.cycle,
            report.ended.len(),
            report.stalled.len(),
            report.captures_started.len(),
            report.transcodes_started
        );
        Ok(report)
    }

    /// Polls every task and collects the ones that ended, with their outcome.
    async fn reap(&mut self, report: &mut CycleReport) -> HashMap<u32, ExitOutcome> {
        let check_growth = self.cycle_count % 2 == 0;
        let grace = self.settings.recorder.grace_period();
        let probe = Arc::clone(&self.probe);
        let mut ended = HashMap::new();

        for task in self.tasks.iter_mut() {
            let pid = task.process_id();
            match task.process_mut().try_exit() {
                Ok(Some(outcome)) => {
                    debug!("Task {} exited: {}", task, outcome);
                    ended.insert(pid, outcome);
                    report.ended.push(pid);
                }
                Err(e) => {
                    warn!("Cannot poll task {}, terminating it: {}", task, e);
                    let outcome = terminate_task(task, grace).await;
                    ended.insert(pid, outcome);
                    report.ended.push(pid);
                }
                Ok(None) if !check_growth => {}
                Ok(None) => {
                    if let Some(outcome) = check_progress(probe.as_ref(), task, grace).await {
                        ended.insert(pid, outcome);
                        report.stalled.push(pid);
                    }
                }
            }
        }
        ended
    }

    async fn dispatch_ended(
        &mut self,
        task: &Task,
        outcome: ExitOutcome,
        report: &mut CycleReport,
    ) -> Result<(), RecorderError> {
        match task.kind() {
            TaskKind::Capture => self.capture_ended(task, outcome, report).await,
            TaskKind::Transcode { .. } => {
                self.transcode_ended(task, outcome).await;
                Ok(())
            }
        }
    }

    /// Starts a capture for every listed item that has none.
    async fn discover(&mut self, report: &mut CycleReport) -> Result<(), RecorderError> {
        let items = self.catalog.available_items().await?;
        let mut seen = HashSet::new();

        for item in items {
            if !seen.insert(item.clone()) || self.tasks.contains_active_capture(&item) {
                continue;
            }
            self.start_capture(&item, report).await?;
        }
        Ok(())
    }

    /// Sends a terminate signal to every tracked process still running.
    ///
    /// Does not wait and leaves the store untouched. Returns how many
    /// processes were signalled.
    pub fn terminate_all(&mut self) -> usize {
        let mut signalled = 0;
        for task in self.tasks.iter_mut() {
            match task.process_mut().try_exit() {
                Ok(None) => match task.terminate() {
                    Ok(()) => {
                        info!("Terminated {}", task);
                        signalled += 1;
                    }
                    Err(e) => warn!("Failed to terminate {}: {}", task, e),
                },
                Ok(Some(_)) => {}
                Err(e) => debug!("Not signalling {}: {}", task, e),
            }
        }
        signalled
    }
}

/// Growth check for a running task.
///
/// Returns the outcome to reap it with when a capture stalled or lost its
/// output file; transcodes only have their size recorded.
async fn check_progress(
    probe: &dyn FileProbe,
    task: &mut Task,
    grace: Duration,
) -> Option<ExitOutcome> {
    match probe.size(task.output_path()).await {
        Ok(size) if task.is_capture() && size == task.last_observed_size() => {
            warn!("Capture {} stalled at {} bytes, terminating", task, size);
            Some(terminate_task(task, grace).await)
        }
        Ok(size) => {
            task.set_last_observed_size(size);
            None
        }
        Err(e) if task.is_capture() => {
            warn!("Capture {} has no output ({}), terminating", task, e);
            Some(terminate_task(task, grace).await)
        }
        Err(e) => {
            warn!("Cannot size output of {}: {}", task, e);
            None
        }
    }
}

/// Signals the task and waits up to `grace` for it to exit, so its output
/// file is complete before the end handler looks at it.
async fn terminate_task(task: &mut Task, grace: Duration) -> ExitOutcome {
    if let Err(e) = task.terminate() {
        warn!("Failed to terminate {}: {}", task, e);
    }
    match task.process_mut().wait_timeout(grace).await {
        Ok(Some(outcome)) => outcome,
        Ok(None) => {
            warn!("{} still running {:?} after terminate", task, grace);
            ExitOutcome::unknown()
        }
        Err(e) => {
            debug!("Cannot wait for {}: {}", task, e);
            ExitOutcome::unknown()
        }
    }
}
