use crate::{BundleType, CookingTask, TaskKey, TaskList, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressColor {
    Gray,
    Blue,
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub color: ProgressColor,
    pub animated: bool,
    pub label: String,
}

impl ProgressView {
    pub fn for_task(task: &CookingTask) -> Self {
        let (color, animated) = match task.status {
            TaskStatus::New => (ProgressColor::Gray, false),
            TaskStatus::Pending => (ProgressColor::Blue, true),
            TaskStatus::Done => (ProgressColor::Green, false),
            TaskStatus::Failed => (ProgressColor::Red, false),
        };
        let label = task
            .progress_message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(task.status.as_str())
            .to_string();
        Self {
            color,
            animated,
            label,
        }
    }
}

/// Everything the presentation layer needs to draw one task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub key: TaskKey,
    pub status: TaskStatus,
    pub origin: Option<String>,
    pub path: Option<String>,
    pub browse_url: Option<String>,
    pub email: Option<String>,
    pub progress: ProgressView,
    /// Present only once the bundle is ready.
    pub download_url: Option<String>,
    pub selected: bool,
}

impl TaskRowView {
    pub fn new(task: &CookingTask, selected: bool) -> Self {
        let download_url = match task.status {
            TaskStatus::Done => task.fetch_url.clone(),
            _ => None,
        };
        Self {
            key: task.key(),
            status: task.status,
            origin: task.origin.clone(),
            path: task.path.clone(),
            browse_url: task.browse_url.clone(),
            email: task.email.clone(),
            progress: ProgressView::for_task(task),
            download_url,
            selected,
        }
    }

    pub fn bundle_type(&self) -> BundleType {
        self.key.bundle_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerViewModel {
    pub rows: Vec<TaskRowView>,
    pub in_flight: usize,
    pub done: usize,
    pub failed: usize,
}

impl TrackerViewModel {
    pub fn new(tasks: &TaskList, is_selected: impl Fn(&TaskKey) -> bool) -> Self {
        let mut view = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::New | TaskStatus::Pending => view.in_flight += 1,
                TaskStatus::Done => view.done += 1,
                TaskStatus::Failed => view.failed += 1,
            }
            view.rows.push(TaskRowView::new(task, is_selected(&task.key())));
        }
        view
    }
}
