//! On-disk shape of a cooking task and the upgrade of older records.
//!
//! Records written before bundle types existed carry `object_type`
//! (`directory` or `revision`) and a bare `object_id` hash instead of
//! `bundle_type` and `swhid`. They are upgraded once, when the slot is loaded;
//! the next save writes them back in the current shape.

use cooking_core::{BundleType, CookingTask, TaskStatus};
use serde::{Deserialize, Serialize};
use tracker_logging::tracker_warn;

/// One entry of the persisted slot. Every field is optional on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swhid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl From<&CookingTask> for StoredRecord {
    fn from(task: &CookingTask) -> Self {
        Self {
            swhid: Some(task.swhid.clone()),
            bundle_type: Some(task.bundle_type.as_str().to_string()),
            status: Some(task.status.as_str().to_string()),
            email: task.email.clone(),
            origin: task.origin.clone(),
            path: task.path.clone(),
            browse_url: task.browse_url.clone(),
            fetch_url: task.fetch_url.clone(),
            progress_message: task.progress_message.clone(),
            object_type: None,
            object_id: None,
        }
    }
}

/// Maps a stored record of any known shape to a current task.
///
/// Returns `None` when neither the current nor the legacy identity fields
/// name a bundle type and an object.
pub fn upgrade(record: StoredRecord) -> Option<CookingTask> {
    let legacy_kind = record.object_type.as_deref().and_then(legacy_object_kind);

    let bundle_type = match record.bundle_type.as_deref() {
        Some(raw) => match raw.parse::<BundleType>() {
            Ok(bundle_type) => bundle_type,
            Err(err) => {
                tracker_warn!("Dropping stored task: {}", err);
                return None;
            }
        },
        None => legacy_kind?.0,
    };

    let swhid = match non_blank(record.swhid) {
        Some(swhid) => swhid,
        None => {
            let (_, tag) = legacy_kind?;
            let object_id = non_blank(record.object_id)?;
            format!("swh:1:{tag}:{object_id}")
        }
    };

    let status = match record.status.as_deref() {
        None => TaskStatus::New,
        Some(raw) => raw.parse::<TaskStatus>().unwrap_or_else(|err| {
            // Unknown states are polled again rather than dropped.
            tracker_warn!("Stored task {} has {}; treating it as new", swhid, err);
            TaskStatus::New
        }),
    };

    Some(CookingTask {
        swhid,
        bundle_type,
        status,
        email: non_blank(record.email),
        origin: non_blank(record.origin),
        path: non_blank(record.path),
        browse_url: non_blank(record.browse_url),
        fetch_url: non_blank(record.fetch_url),
        progress_message: record.progress_message,
    })
}

fn legacy_object_kind(object_type: &str) -> Option<(BundleType, &'static str)> {
    match object_type {
        "directory" => Some((BundleType::Flat, "dir")),
        "revision" => Some((BundleType::GitBare, "rev")),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
