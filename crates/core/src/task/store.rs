//! In-memory task store.

use thiserror::Error;

use super::types::Task;

/// Errors from [`TaskStore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskStoreError {
    #[error("a task with process id {0} is already tracked")]
    DuplicateProcess(u32),

    #[error("item {0} already has an active capture")]
    CaptureAlreadyActive(String),
}

/// Tasks currently owned by the recorder.
///
/// Holds at most one capture per item and never two tasks with the same
/// process id.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new task.
    pub fn add(&mut self, task: Task) -> Result<(), TaskStoreError> {
        if self.get(task.process_id()).is_some() {
            return Err(TaskStoreError::DuplicateProcess(task.process_id()));
        }
        if task.is_capture() && self.contains_active_capture(task.item_id()) {
            return Err(TaskStoreError::CaptureAlreadyActive(
                task.item_id().to_string(),
            ));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Removes every task matching `predicate` in one pass and returns them
    /// in insertion order.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<Task>
    where
        F: FnMut(&Task) -> bool,
    {
        let (removed, kept): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| predicate(task));
        self.tasks = kept;
        removed
    }

    pub fn get(&self, process_id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.process_id() == process_id)
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains_active_capture(&self, item_id: &str) -> bool {
        self.tasks
            .iter()
            .any(|t| t.is_capture() && t.item_id() == item_id)
    }

    pub fn capture_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_capture()).count()
    }

    pub fn transcode_count(&self) -> usize {
        self.tasks.len() - self.capture_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProcessLauncher;
    use std::path::PathBuf;

    fn capture(launcher: &MockProcessLauncher, item: &str) -> Task {
        Task::capture(
            item,
            PathBuf::from(format!("/rec/{}/rec_1.ts", item)),
            launcher.spawn_running(),
        )
    }

    fn transcode(launcher: &MockProcessLauncher, item: &str) -> Task {
        Task::transcode(
            item,
            PathBuf::from(format!("/rec/{}/rec_1.ts", item)),
            PathBuf::from(format!("/rec/{}/rec_1.mp4", item)),
            launcher.spawn_running(),
        )
    }

    #[tokio::test]
    async fn test_add_and_counts() {
        let launcher = MockProcessLauncher::new();
        let mut store = TaskStore::new();
        assert!(store.is_empty());

        store.add(capture(&launcher, "alice")).unwrap();
        store.add(capture(&launcher, "bob")).unwrap();
        store.add(transcode(&launcher, "alice")).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.capture_count(), 2);
        assert_eq!(store.transcode_count(), 1);
        assert!(store.contains_active_capture("alice"));
        assert!(!store.contains_active_capture("carol"));
    }

    #[tokio::test]
    async fn test_rejects_second_capture_for_item() {
        let launcher = MockProcessLauncher::new();
        let mut store = TaskStore::new();
        store.add(capture(&launcher, "alice")).unwrap();
        let tracked = store.all()[0].process_id();

        let second = capture(&launcher, "alice");
        let rejected = second.process_id();
        let err = store.add(second).unwrap_err();
        assert_eq!(err, TaskStoreError::CaptureAlreadyActive("alice".to_string()));
        assert_eq!(store.len(), 1);

        // The rejected task is dropped and its process released
        assert!(launcher.was_terminated(rejected));
        assert!(!launcher.was_terminated(tracked));
    }

    #[tokio::test]
    async fn test_transcode_alongside_capture_of_same_item() {
        let launcher = MockProcessLauncher::new();
        let mut store = TaskStore::new();
        store.add(transcode(&launcher, "alice")).unwrap();
        store.add(capture(&launcher, "alice")).unwrap();
        assert!(store.contains_active_capture("alice"));
    }

    #[tokio::test]
    async fn test_rejects_duplicate_pid() {
        let launcher = MockProcessLauncher::new();
        let mut store = TaskStore::new();
        let first = capture(&launcher, "alice");
        let pid = first.process_id();
        store.add(first).unwrap();

        let reused = Task::capture(
            "bob",
            PathBuf::from("/rec/bob/rec_1.ts"),
            launcher.spawn_running_with_pid(pid),
        );
        let err = store.add(reused).unwrap_err();
        assert_eq!(err, TaskStoreError::DuplicateProcess(pid));
    }

    #[tokio::test]
    async fn test_remove_where_is_batched() {
        let launcher = MockProcessLauncher::new();
        let mut store = TaskStore::new();
        store.add(capture(&launcher, "alice")).unwrap();
        store.add(capture(&launcher, "bob")).unwrap();
        store.add(capture(&launcher, "carol")).unwrap();

        let removed = store.remove_where(|t| t.item_id() != "bob");
        let ids: Vec<&str> = removed.iter().map(Task::item_id).collect();
        assert_eq!(ids, vec!["alice", "carol"]);

        assert_eq!(store.len(), 1);
        assert!(store.contains_active_capture("bob"));
        assert!(store.remove_where(|_| false).is_empty());
    }

    #[tokio::test]
    async fn test_get_by_pid() {
        let launcher = MockProcessLauncher::new();
        let mut store = TaskStore::new();
        let task = capture(&launcher, "alice");
        let pid = task.process_id();
        store.add(task).unwrap();

        assert_eq!(store.get(pid).map(Task::item_id), Some("alice"));
        assert!(store.get(pid + 1000).is_none());
    }
}
