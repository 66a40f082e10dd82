use crate::{TaskKey, TaskRowView};

/// Instruction for the presentation layer. The core never draws anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InsertRow(TaskRowView),
    UpdateRow(TaskRowView),
    RemoveRow(TaskKey),
    ClearRows,
    Notify(Notice),
    /// Ask the user to correct the notification address.
    PromptInvalidEmail { email: String },
    /// Ask the user to confirm resubmitting a task whose download link died.
    PromptRecook { key: TaskKey },
    /// Close the "cook this object" dialog, whatever the outcome.
    DismissCookPrompt,
    StartDownload { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CookSubmitted {
        key: TaskKey,
        task_list_url: Option<String>,
    },
    CookFailed {
        key: TaskKey,
        reason: String,
    },
    RecookSubmitted {
        key: TaskKey,
    },
    RecookFailed {
        key: TaskKey,
        reason: String,
    },
    DownloadUnreachable {
        url: String,
        reason: String,
    },
}
