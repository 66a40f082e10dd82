use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use cooking_core::{CookingTask, TaskList};
use tracker_logging::{tracker_debug, tracker_warn};

use crate::legacy::{upgrade, StoredRecord};
use crate::persist::{AtomicFileWriter, PersistError};

/// Fixed name of the persisted slot. It carries no version; old record shapes
/// are upgraded on load.
pub const SLOT_NAME: &str = "swh-vault-cooking-tasks";

/// Durable home of the task list.
pub trait TaskStore {
    /// The persisted tasks. An absent, empty or corrupt slot yields an empty list.
    fn load(&self) -> TaskList;

    /// Replaces the whole slot with `tasks`.
    fn save(&self, tasks: &TaskList) -> Result<(), PersistError>;
}

impl<T: TaskStore + ?Sized> TaskStore for &T {
    fn load(&self) -> TaskList {
        (**self).load()
    }

    fn save(&self, tasks: &TaskList) -> Result<(), PersistError> {
        (**self).save(tasks)
    }
}

fn decode_slot(content: &str) -> TaskList {
    if content.trim().is_empty() {
        return TaskList::new();
    }
    let values: Vec<serde_json::Value> = match serde_json::from_str(content) {
        Ok(values) => values,
        Err(err) => {
            tracker_warn!("Ignoring unreadable task slot: {}", err);
            return TaskList::new();
        }
    };

    let stored = values.len();
    let tasks: Vec<CookingTask> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<StoredRecord>(value) {
            Ok(record) => upgrade(record),
            Err(err) => {
                tracker_warn!("Skipping malformed stored task: {}", err);
                None
            }
        })
        .collect();
    let list = TaskList::from_tasks(tasks);
    if list.len() != stored {
        tracker_debug!("Loaded {} of {} stored tasks", list.len(), stored);
    }
    list
}

fn encode_slot(tasks: &TaskList) -> Result<String, PersistError> {
    let records: Vec<StoredRecord> = tasks.iter().map(StoredRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Slot stored as `<state_dir>/swh-vault-cooking-tasks.json`.
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    writer: AtomicFileWriter,
}

impl FileTaskStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        let path = state_dir.as_ref().join(format!("{SLOT_NAME}.json"));
        Self {
            writer: AtomicFileWriter::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.target()
    }
}

impl TaskStore for FileTaskStore {
    fn load(&self) -> TaskList {
        match fs::read_to_string(self.path()) {
            Ok(content) => decode_slot(&content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => TaskList::new(),
            Err(err) => {
                tracker_warn!("Failed to read task slot {:?}: {}", self.path(), err);
                TaskList::new()
            }
        }
    }

    fn save(&self, tasks: &TaskList) -> Result<(), PersistError> {
        let content = encode_slot(tasks)?;
        self.writer.write(&content)
    }
}

/// Slot kept in memory, serialized exactly like the file slot.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose slot already holds `raw`.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn set_raw(&self, raw: impl Into<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(raw.into());
        }
    }
}

impl TaskStore for MemoryTaskStore {
    fn load(&self) -> TaskList {
        match self.raw() {
            Some(content) => decode_slot(&content),
            None => TaskList::new(),
        }
    }

    fn save(&self, tasks: &TaskList) -> Result<(), PersistError> {
        let content = encode_slot(tasks)?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| PersistError::StateDir("memory slot poisoned".into()))?;
        *slot = Some(content);
        Ok(())
    }
}
