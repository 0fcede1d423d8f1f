//! Follow-up work once a capture or transcode has ended.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::process::ExitOutcome;
use crate::task::Task;

use super::controller::Recorder;
use super::launch::Launch;
use super::types::{CycleReport, RecorderError};

impl Recorder {
    /// Capture-end: drop empty files, otherwise chain a transcode if enabled.
    ///
    /// Safe to call for a file that is already gone.
    pub(super) async fn capture_ended(
        &mut self,
        task: &Task,
        outcome: ExitOutcome,
        report: &mut CycleReport,
    ) -> Result<(), RecorderError> {
        let path = task.output_path();
        if !self.probe.exists(path).await {
            debug!("Capture file {} no longer exists", path.display());
            return Ok(());
        }

        let size = match self.probe.size(path).await {
            Ok(size) => size,
            Err(e) => {
                warn!("Cannot size capture of {}: {}", task.item_id(), e);
                return Ok(());
            }
        };

        if size == 0 {
            info!(
                "Capture of {} ended ({}) with an empty file, deleting {}",
                task.item_id(),
                outcome,
                path.display()
            );
            if let Err(e) = self.probe.remove(path).await {
                warn!("Failed to delete {}: {}", path.display(), e);
            }
            return Ok(());
        }

        info!(
            "Capture of {} ended ({}): {} bytes in {}",
            task.item_id(),
            outcome,
            size,
            path.display()
        );

        if !self.settings.transcode.enabled {
            return Ok(());
        }
        self.start_transcode(task.item_id(), path.to_path_buf(), report)
            .await
    }

    /// Launches a transcode of `source`. The source file stays until the
    /// transcode has succeeded.
    pub(super) async fn start_transcode(
        &mut self,
        item_id: &str,
        source: PathBuf,
        report: &mut CycleReport,
    ) -> Result<(), RecorderError> {
        let output = source.with_extension(&self.settings.transcode.extension);
        let command = self.transcode_command(&source, &output);

        match self.launch_with_grace(&command).await? {
            Launch::Running(process) => {
                let pid = process.id();
                let task = Task::transcode(item_id, source.clone(), output, process);
                match self.tasks.add(task) {
                    Ok(()) => {
                        info!("Transcoding {} (pid {})", source.display(), pid);
                        report.transcodes_started += 1;
                    }
                    Err(e) => error!(
                        "Not tracking transcode of {}, terminating it: {}",
                        source.display(),
                        e
                    ),
                }
            }
            Launch::Exited { outcome, stderr } => {
                self.finish_transcode(item_id, &source, &output, outcome, &stderr)
                    .await;
            }
            Launch::Failed => {
                error!(
                    "Transcode of {} could not start, keeping the capture",
                    source.display()
                );
            }
        }
        Ok(())
    }

    /// Transcode-end for a tracked transcode task.
    pub(super) async fn transcode_ended(&self, task: &Task, outcome: ExitOutcome) {
        let Some(source) = task.secondary_path() else {
            return;
        };
        let stderr = task.process().stderr_tail();
        self.finish_transcode(task.item_id(), source, task.output_path(), outcome, &stderr)
            .await;
    }

    /// Deletes `source` only when the transcode exited successfully and left a
    /// non-empty `output`. Both files are kept otherwise.
    async fn finish_transcode(
        &self,
        item_id: &str,
        source: &Path,
        output: &Path,
        outcome: ExitOutcome,
        stderr: &[String],
    ) {
        if !outcome.success() {
            error!(
                "Transcode of {} for {} failed ({}), keeping both files: {}",
                source.display(),
                item_id,
                outcome,
                stderr.join(" | ")
            );
            return;
        }

        match self.probe.size(output).await {
            Ok(size) if size > 0 => {
                info!(
                    "Transcode for {} finished: {} ({} bytes)",
                    item_id,
                    output.display(),
                    size
                );
                if let Err(e) = self.probe.remove(source).await {
                    warn!("Failed to delete {}: {}", source.display(), e);
                }
            }
            Ok(_) => error!(
                "Transcode of {} produced an empty {}, keeping both files",
                source.display(),
                output.display()
            ),
            Err(e) => error!(
                "Transcode of {} left no output ({}), keeping the capture",
                source.display(),
                e
            ),
        }
    }
}
