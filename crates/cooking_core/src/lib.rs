//! Cooking core: pure task-tracking state machine and view-model helpers.
mod effect;
mod email;
mod list;
mod rows;
mod task;
mod view_model;

pub use effect::{Effect, Notice};
pub use email::{normalize_email, InvalidEmail};
pub use list::{MergeOutcome, MergeSummary, TaskList};
pub use rows::{RowBook, Selection};
pub use task::{
    BundleType, CookingTask, ParseBundleTypeError, ParseStatusError, StatusUpdate, TaskKey,
    TaskStatus,
};
pub use view_model::{ProgressColor, ProgressView, TaskRowView, TrackerViewModel};
