use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Kind of artifact the vault produces for an archived object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BundleType {
    /// Directory tarball.
    Flat,
    /// Git-importable export of a revision.
    GitBare,
}

impl BundleType {
    /// Name used in the persisted slot and in status payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            BundleType::Flat => "flat",
            BundleType::GitBare => "git_bare",
        }
    }

    /// Path segment of the vault API endpoints.
    pub fn api_segment(self) -> &'static str {
        match self {
            BundleType::Flat => "flat",
            BundleType::GitBare => "git-bare",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BundleType::Flat => "tarball",
            BundleType::GitBare => "git bare",
        }
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bundle type {0:?}")]
pub struct ParseBundleTypeError(pub String);

impl FromStr for BundleType {
    type Err = ParseBundleTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(BundleType::Flat),
            "git_bare" | "git-bare" => Ok(BundleType::GitBare),
            _ => Err(ParseBundleTypeError(s.to_string())),
        }
    }
}

/// Lifecycle of a cooking task: `New -> Pending -> Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    New,
    Pending,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    /// Terminal tasks are no longer polled.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }

    /// Position in the forward-only ordering; both terminal states share a rank.
    fn rank(self) -> u8 {
        match self {
            TaskStatus::New => 0,
            TaskStatus::Pending => 1,
            TaskStatus::Done | TaskStatus::Failed => 2,
        }
    }

    /// Whether the poller may move a task from `self` to `next`.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cooking status {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(TaskStatus::New),
            "pending" => Ok(TaskStatus::Pending),
            "done" => Ok(TaskStatus::Done),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Identity of a task: at most one task per key is tracked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey {
    pub bundle_type: BundleType,
    pub swhid: String,
}

impl TaskKey {
    pub fn new(bundle_type: BundleType, swhid: impl Into<String>) -> Self {
        Self {
            bundle_type,
            swhid: swhid.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bundle_type, self.swhid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookingTask {
    pub swhid: String,
    pub bundle_type: BundleType,
    pub status: TaskStatus,
    pub email: Option<String>,
    pub origin: Option<String>,
    pub path: Option<String>,
    pub browse_url: Option<String>,
    pub fetch_url: Option<String>,
    pub progress_message: Option<String>,
}

impl CookingTask {
    /// A freshly submitted task in the `new` state.
    pub fn new(key: TaskKey) -> Self {
        Self {
            swhid: key.swhid,
            bundle_type: key.bundle_type,
            status: TaskStatus::New,
            email: None,
            origin: None,
            path: None,
            browse_url: None,
            fetch_url: None,
            progress_message: None,
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.bundle_type, self.swhid.clone())
    }

    pub fn has_key(&self, key: &TaskKey) -> bool {
        self.bundle_type == key.bundle_type && self.swhid == key.swhid
    }
}

/// Fields reported by one status request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: TaskStatus,
    pub fetch_url: Option<String>,
    pub progress_message: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            fetch_url: None,
            progress_message: None,
        }
    }

    pub fn with_fetch_url(mut self, url: impl Into<String>) -> Self {
        self.fetch_url = Some(url.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = Some(message.into());
        self
    }
}
