//! Launching captures and transcodes.

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::process::{CommandSpec, ExitOutcome, ProcessHandle};
use crate::task::Task;

use super::controller::Recorder;
use super::types::{CycleReport, RecorderError};

/// Result of launching a program and waiting out the grace period.
pub(super) enum Launch {
    /// Still running after the grace period.
    Running(Box<dyn ProcessHandle>),
    /// Exited within the grace period.
    Exited {
        outcome: ExitOutcome,
        stderr: Vec<String>,
    },
    /// Could not be spawned at all.
    Failed,
}

/// Replaces `{name}` placeholders in one pass; unknown placeholders stay as is.
pub(super) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let matched = vars.iter().find_map(|(name, value)| {
            let key = format!("{{{}}}", name);
            tail.starts_with(&key).then_some((key.len(), *value))
        });
        match matched {
            Some((len, value)) => {
                out.push_str(value);
                rest = &tail[len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn format_stderr(stderr: &[String]) -> String {
    if stderr.is_empty() {
        "no output".to_string()
    } else {
        stderr.join(" | ")
    }
}

impl Recorder {
    /// `<output_root>/<item>/<YYYY-MM-DD>` for today's local date.
    pub(super) fn capture_dir(&self, item_id: &str) -> PathBuf {
        self.settings
            .recorder
            .output_root
            .join(item_id)
            .join(Local::now().format("%Y-%m-%d").to_string())
    }

    /// First `rec_N.<ext>` in `dir` that does not exist yet, N from 1.
    pub(super) async fn next_output_path(&self, dir: &Path) -> PathBuf {
        let extension = &self.settings.capture.extension;
        let mut n: u32 = 1;
        loop {
            let candidate = dir.join(format!("rec_{}.{}", n, extension));
            if !self.probe.exists(&candidate).await {
                return candidate;
            }
            n += 1;
        }
    }

    pub(super) fn capture_command(&self, item_id: &str, output: &Path) -> CommandSpec {
        let capture = &self.settings.capture;
        let url = render(&capture.url_template, &[("item", item_id)]);
        let output = output.to_string_lossy();
        let vars = [
            ("url", url.as_str()),
            ("item", item_id),
            ("quality", capture.quality.as_str()),
            ("output", output.as_ref()),
        ];
        CommandSpec::new(
            &capture.program,
            capture.args.iter().map(|arg| render(arg, &vars)),
        )
    }

    pub(super) fn transcode_command(&self, input: &Path, output: &Path) -> CommandSpec {
        let transcode = &self.settings.transcode;
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let vars = [("input", input.as_ref()), ("output", output.as_ref())];
        CommandSpec::new(
            &transcode.program,
            transcode.args.iter().map(|arg| render(arg, &vars)),
        )
    }

    /// Launches `command` and waits up to the grace period for it to exit.
    ///
    /// Only a missing program is an error; other spawn failures are logged.
    pub(super) async fn launch_with_grace(
        &self,
        command: &CommandSpec,
    ) -> Result<Launch, RecorderError> {
        let mut process = match self.launcher.launch(command).await {
            Ok(process) => process,
            Err(e) if e.is_systemic() => {
                error!("Cannot launch {}: {}", command.program.display(), e);
                return Err(e.into());
            }
            Err(e) => {
                warn!("Failed to launch {}: {}", command, e);
                return Ok(Launch::Failed);
            }
        };

        let waited = process
            .wait_timeout(self.settings.recorder.grace_period())
            .await;
        match waited {
            Ok(None) => Ok(Launch::Running(process)),
            Ok(Some(outcome)) => Ok(Launch::Exited {
                outcome,
                stderr: process.stderr_tail(),
            }),
            Err(e) => {
                warn!("Lost track of process {}: {}", process.id(), e);
                Ok(Launch::Exited {
                    outcome: ExitOutcome::unknown(),
                    stderr: process.stderr_tail(),
                })
            }
        }
    }

    /// Starts a capture of `item_id` and registers it if it survives the
    /// grace period.
    pub(super) async fn start_capture(
        &mut self,
        item_id: &str,
        report: &mut CycleReport,
    ) -> Result<(), RecorderError> {
        let dir = self.capture_dir(item_id);
        if let Err(e) = self.probe.ensure_dir(&dir).await {
            warn!("Cannot create capture directory for {}: {}", item_id, e);
            report.captures_failed.push(item_id.to_string());
            return Ok(());
        }

        let output = self.next_output_path(&dir).await;
        let command = self.capture_command(item_id, &output);

        match self.launch_with_grace(&command).await? {
            Launch::Running(process) => {
                let pid = process.id();
                match self.tasks.add(Task::capture(item_id, output.clone(), process)) {
                    Ok(()) => {
                        info!(
                            "Capture of {} started (pid {}): {}",
                            item_id,
                            pid,
                            output.display()
                        );
                        report.captures_started.push(item_id.to_string());
                    }
                    Err(e) => {
                        warn!("Not tracking capture of {}, terminating it: {}", item_id, e);
                        report.captures_failed.push(item_id.to_string());
                    }
                }
            }
            Launch::Exited { outcome, stderr } => {
                warn!(
                    "Capture of {} exited during the grace period ({}): {}",
                    item_id,
                    outcome,
                    format_stderr(&stderr)
                );
                report.captures_failed.push(item_id.to_string());
            }
            Launch::Failed => report.captures_failed.push(item_id.to_string()),
        }
        Ok(())
    }
}
