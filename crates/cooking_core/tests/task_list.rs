use std::sync::Once;

use cooking_core::{
    BundleType, CookingTask, MergeOutcome, MergeSummary, StatusUpdate, TaskKey, TaskList,
    TaskStatus,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(tracker_logging::initialize_for_tests);
}

fn flat(swhid: &str) -> TaskKey {
    TaskKey::new(BundleType::Flat, swhid)
}

fn list_of(keys: &[TaskKey]) -> TaskList {
    TaskList::from_tasks(keys.iter().cloned().map(CookingTask::new))
}

#[test]
fn repeated_inserts_keep_one_task_per_key() {
    init_logging();
    let mut tasks = TaskList::new();
    let key = flat("swh:1:dir:abc");

    assert!(tasks.insert(CookingTask::new(key.clone())));
    for _ in 0..3 {
        assert!(!tasks.insert(CookingTask::new(key.clone())));
    }
    assert_eq!(tasks.len(), 1);

    // Same swhid, other bundle type, is a different task.
    assert!(tasks.insert(CookingTask::new(TaskKey::new(
        BundleType::GitBare,
        "swh:1:dir:abc"
    ))));
    assert_eq!(tasks.len(), 2);
}

#[test]
fn duplicate_stored_records_collapse_to_first() {
    let mut first = CookingTask::new(flat("swh:1:dir:abc"));
    first.status = TaskStatus::Done;
    let second = CookingTask::new(flat("swh:1:dir:abc"));

    let tasks = TaskList::from_tasks([first, second]);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks.as_slice()[0].status, TaskStatus::Done);
}

#[test]
fn removing_twice_is_harmless() {
    let key = flat("swh:1:dir:abc");
    let mut tasks = list_of(&[key.clone(), flat("swh:1:dir:def")]);

    assert!(tasks.remove(&key).is_some());
    assert!(tasks.remove(&key).is_none());
    assert!(!tasks.contains(&key));
    assert_eq!(tasks.len(), 1);
}

#[test]
fn only_unfinished_tasks_are_in_flight() {
    let keys = [
        flat("swh:1:dir:a"),
        flat("swh:1:dir:b"),
        flat("swh:1:dir:c"),
        flat("swh:1:dir:d"),
    ];
    let mut tasks = list_of(&keys);
    tasks.merge([
        (keys[1].clone(), StatusUpdate::new(TaskStatus::Pending)),
        (keys[2].clone(), StatusUpdate::new(TaskStatus::Done)),
        (keys[3].clone(), StatusUpdate::new(TaskStatus::Failed)),
    ]);

    assert_eq!(tasks.in_flight(), vec![keys[0].clone(), keys[1].clone()]);
}

#[test]
fn terminal_status_is_sticky_until_recook() {
    let key = flat("swh:1:dir:abc");
    let mut tasks = list_of(&[key.clone()]);

    let done = StatusUpdate::new(TaskStatus::Done).with_fetch_url("https://vault/abc.tar.gz");
    assert_eq!(tasks.apply_update(&key, done), MergeOutcome::Applied);

    for status in [TaskStatus::New, TaskStatus::Pending, TaskStatus::Failed] {
        assert_eq!(
            tasks.apply_update(&key, StatusUpdate::new(status)),
            MergeOutcome::Rejected
        );
    }
    let task = tasks.get(&key).unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.fetch_url.as_deref(), Some("https://vault/abc.tar.gz"));

    assert!(tasks.reset_for_recook(&key));
    let task = tasks.get(&key).unwrap();
    assert_eq!(task.status, TaskStatus::New);
    assert_eq!(task.fetch_url, None);
    assert_eq!(task.progress_message, None);

    // A task that is already in flight is not reset again.
    assert!(!tasks.reset_for_recook(&key));
}

#[test]
fn pending_does_not_fall_back_to_new() {
    let key = flat("swh:1:dir:abc");
    let mut tasks = list_of(&[key.clone()]);
    tasks.apply_update(
        &key,
        StatusUpdate::new(TaskStatus::Pending).with_message("fetching sources"),
    );

    assert_eq!(
        tasks.apply_update(&key, StatusUpdate::new(TaskStatus::New)),
        MergeOutcome::Rejected
    );
    let task = tasks.get(&key).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.progress_message.as_deref(), Some("fetching sources"));
}

#[test]
fn merge_skips_tasks_removed_mid_flight() {
    let kept = flat("swh:1:dir:kept");
    let removed = flat("swh:1:dir:removed");
    let mut tasks = list_of(&[kept.clone(), removed.clone()]);
    let in_flight = tasks.in_flight();
    tasks.remove(&removed);

    let summary = tasks.merge(
        in_flight
            .into_iter()
            .map(|key| (key, StatusUpdate::new(TaskStatus::Pending))),
    );

    assert_eq!(
        summary,
        MergeSummary {
            applied: 1,
            missing: 1,
            rejected: 0
        }
    );
    assert!(!tasks.contains(&removed));
    assert_eq!(tasks.get(&kept).unwrap().status, TaskStatus::Pending);
}

#[test]
fn finds_task_by_fetch_url() {
    let key = flat("swh:1:dir:abc");
    let mut tasks = list_of(&[key.clone(), flat("swh:1:dir:def")]);
    tasks.apply_update(
        &key,
        StatusUpdate::new(TaskStatus::Done).with_fetch_url("https://vault/abc.tar.gz"),
    );

    assert_eq!(
        tasks.find_by_fetch_url("https://vault/abc.tar.gz").map(CookingTask::key),
        Some(key)
    );
    assert!(tasks.find_by_fetch_url("https://vault/other.tar.gz").is_none());
}
