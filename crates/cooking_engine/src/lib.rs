//! Cooking engine: vault client, durable task store and the tracker controller.
mod client;
mod legacy;
mod persist;
mod store;
mod timer;
mod tracker;
mod types;

pub use client::{ReqwestVaultClient, VaultClient, VaultSettings};
pub use legacy::{upgrade, StoredRecord};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use store::{FileTaskStore, MemoryTaskStore, TaskStore, SLOT_NAME};
pub use timer::{sleep_until_due, PollTimer};
pub use tracker::{
    CookingTracker, CycleOutcome, FetchOutcome, RecookOutcome, SubmitOutcome, SubmitRequest,
    TrackerSettings, UiSink,
};
pub use types::{CookRequest, FailureKind, LinkState, VaultError};
