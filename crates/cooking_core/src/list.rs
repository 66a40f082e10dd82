use crate::{CookingTask, StatusUpdate, TaskKey, TaskStatus};

/// Result of merging one status report into the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// The task was removed while its status request was in flight.
    Missing,
    /// The report would move the task backwards or out of a terminal state.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub applied: usize,
    pub missing: usize,
    pub rejected: usize,
}

/// Ordered list of tracked tasks, unique by [`TaskKey`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskList {
    tasks: Vec<CookingTask>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from stored records, keeping the first task of each key.
    pub fn from_tasks(tasks: impl IntoIterator<Item = CookingTask>) -> Self {
        let mut list = Self::new();
        for task in tasks {
            list.insert(task);
        }
        list
    }

    pub fn into_tasks(self) -> Vec<CookingTask> {
        self.tasks
    }

    pub fn as_slice(&self) -> &[CookingTask] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &CookingTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, key: &TaskKey) -> Option<&CookingTask> {
        self.tasks.iter().find(|task| task.has_key(key))
    }

    fn get_mut(&mut self, key: &TaskKey) -> Option<&mut CookingTask> {
        self.tasks.iter_mut().find(|task| task.has_key(key))
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.get(key).is_some()
    }

    pub fn find_by_fetch_url(&self, url: &str) -> Option<&CookingTask> {
        self.tasks
            .iter()
            .find(|task| task.fetch_url.as_deref() == Some(url))
    }

    /// Appends `task` unless its key is already tracked. Returns whether it was added.
    pub fn insert(&mut self, task: CookingTask) -> bool {
        if self.contains(&task.key()) {
            return false;
        }
        self.tasks.push(task);
        true
    }

    /// Removes the task with `key`; removing an untracked key is a no-op.
    pub fn remove(&mut self, key: &TaskKey) -> Option<CookingTask> {
        let index = self.tasks.iter().position(|task| task.has_key(key))?;
        Some(self.tasks.remove(index))
    }

    /// Keys of every task the poller still has to refresh.
    pub fn in_flight(&self) -> Vec<TaskKey> {
        self.tasks
            .iter()
            .filter(|task| task.status.is_in_flight())
            .map(CookingTask::key)
            .collect()
    }

    pub fn apply_update(&mut self, key: &TaskKey, update: StatusUpdate) -> MergeOutcome {
        let Some(task) = self.get_mut(key) else {
            return MergeOutcome::Missing;
        };
        if !task.status.can_advance_to(update.status) {
            return MergeOutcome::Rejected;
        }
        task.status = update.status;
        task.fetch_url = update.fetch_url;
        task.progress_message = update.progress_message;
        MergeOutcome::Applied
    }

    /// Merges a batch of poll results, skipping tasks that are no longer tracked.
    pub fn merge(&mut self, reports: impl IntoIterator<Item = (TaskKey, StatusUpdate)>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for (key, update) in reports {
            match self.apply_update(&key, update) {
                MergeOutcome::Applied => summary.applied += 1,
                MergeOutcome::Missing => summary.missing += 1,
                MergeOutcome::Rejected => summary.rejected += 1,
            }
        }
        summary
    }

    /// Puts a terminal task back to `new` so it is resubmitted and polled again.
    /// The dead download link and the stale message are dropped.
    pub fn reset_for_recook(&mut self, key: &TaskKey) -> bool {
        match self.get_mut(key) {
            Some(task) if task.status.is_terminal() => {
                task.status = TaskStatus::New;
                task.fetch_url = None;
                task.progress_message = None;
                true
            }
            _ => false,
        }
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a CookingTask;
    type IntoIter = std::slice::Iter<'a, CookingTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
