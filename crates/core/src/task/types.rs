//! Task types.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::process::{ProcessError, ProcessHandle};

/// What a task's process is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Recording a catalog item to `output_path`.
    Capture,
    /// Converting a finished capture at `source_path` into `output_path`.
    Transcode { source_path: PathBuf },
}

impl TaskKind {
    /// Short lowercase name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Capture => "capture",
            TaskKind::Transcode { .. } => "transcode",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One external process the recorder is responsible for.
///
/// Dropping a task whose process is still running terminates the process,
/// unless [`terminate`](Self::terminate) was already called.
pub struct Task {
    process_id: u32,
    item_id: String,
    kind: TaskKind,
    output_path: PathBuf,
    last_observed_size: u64,
    terminated: bool,
    process: Box<dyn ProcessHandle>,
}

impl Task {
    pub fn capture(
        item_id: impl Into<String>,
        output_path: PathBuf,
        process: Box<dyn ProcessHandle>,
    ) -> Self {
        Self::new(item_id.into(), TaskKind::Capture, output_path, process)
    }

    pub fn transcode(
        item_id: impl Into<String>,
        source_path: PathBuf,
        output_path: PathBuf,
        process: Box<dyn ProcessHandle>,
    ) -> Self {
        Self::new(
            item_id.into(),
            TaskKind::Transcode { source_path },
            output_path,
            process,
        )
    }

    fn new(
        item_id: String,
        kind: TaskKind,
        output_path: PathBuf,
        process: Box<dyn ProcessHandle>,
    ) -> Self {
        Self {
            process_id: process.id(),
            item_id,
            kind,
            output_path,
            last_observed_size: 0,
            terminated: false,
            process,
        }
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn is_capture(&self) -> bool {
        matches!(self.kind, TaskKind::Capture)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The capture file a transcode consumes; `None` for captures.
    pub fn secondary_path(&self) -> Option<&Path> {
        match &self.kind {
            TaskKind::Capture => None,
            TaskKind::Transcode { source_path } => Some(source_path),
        }
    }

    pub fn last_observed_size(&self) -> u64 {
        self.last_observed_size
    }

    pub fn set_last_observed_size(&mut self, size: u64) {
        self.last_observed_size = size;
    }

    pub fn process(&self) -> &dyn ProcessHandle {
        self.process.as_ref()
    }

    pub fn process_mut(&mut self) -> &mut dyn ProcessHandle {
        self.process.as_mut()
    }

    /// Send the terminate signal to the process.
    pub fn terminate(&mut self) -> Result<(), ProcessError> {
        self.terminated = true;
        self.process.terminate()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        if let Ok(Some(_)) = self.process.try_exit() {
            return;
        }
        debug!("Released {} while its process was running, terminating", self);
        if let Err(e) = self.process.terminate() {
            warn!("Failed to terminate released task {}: {}", self, e);
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("process_id", &self.process_id)
            .field("item_id", &self.item_id)
            .field("kind", &self.kind)
            .field("output_path", &self.output_path)
            .field("last_observed_size", &self.last_observed_size)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.process_id, self.item_id, self.kind)
    }
}
