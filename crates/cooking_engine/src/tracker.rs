use std::time::Duration;

use cooking_core::{
    normalize_email, BundleType, CookingTask, Effect, MergeSummary, Notice, RowBook, Selection,
    TaskKey, TaskList, TrackerViewModel,
};
use futures_util::future::join_all;
use tracker_logging::{set_poll_cycle, tracker_debug, tracker_error, tracker_info, tracker_warn};

use crate::{CookRequest, LinkState, PollTimer, TaskStore, VaultClient, VaultError};

/// Receives the effects the tracker produces for the presentation layer.
pub trait UiSink {
    fn apply(&mut self, effect: Effect);
}

impl UiSink for Vec<Effect> {
    fn apply(&mut self, effect: Effect) {
        self.push(effect);
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    /// Link to the task list view, included in the "submitted" notice.
    pub task_list_url: Option<String>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            task_list_url: None,
        }
    }
}

/// A user's "cook this object" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub key: TaskKey,
    pub email: Option<String>,
    pub origin: Option<String>,
    pub path: Option<String>,
    pub browse_url: Option<String>,
}

impl SubmitRequest {
    pub fn new(bundle_type: BundleType, swhid: impl Into<String>) -> Self {
        Self {
            key: TaskKey::new(bundle_type, swhid),
            email: None,
            origin: None,
            path: None,
            browse_url: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn browse_url(mut self, url: impl Into<String>) -> Self {
        self.browse_url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Rejected locally; nothing was sent.
    InvalidEmail,
    /// The key is already tracked; the existing task keeps being polled.
    AlreadyTracked,
    Submitted,
    Failed(VaultError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The store was empty; no request was made.
    Idle,
    Completed {
        polled: usize,
        merged: MergeSummary,
        failures: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The link is alive and the download was started.
    Downloading,
    /// The link is dead; the user was asked to confirm a recook of this task.
    RecookOffered(TaskKey),
    /// The link is dead and no tracked task owns it.
    DeadUntracked,
    /// The probe itself failed.
    Unreachable(VaultError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecookOutcome {
    NoCandidate,
    Resubmitted(TaskKey),
    Failed(TaskKey, VaultError),
}

/// The cooking task tracker of one session.
///
/// Every operation re-reads the store before writing it back, so changes made
/// to the slot while a request was in flight are never overwritten by a stale
/// copy.
pub struct CookingTracker<C, S, U> {
    client: C,
    store: S,
    ui: U,
    settings: TrackerSettings,
    timer: PollTimer,
    rows: RowBook,
    selection: Selection,
    recook_candidate: Option<CookingTask>,
    cycle: u64,
}

impl<C, S, U> CookingTracker<C, S, U>
where
    C: VaultClient,
    S: TaskStore,
    U: UiSink,
{
    pub fn new(client: C, store: S, ui: U, settings: TrackerSettings) -> Self {
        let timer = PollTimer::new(settings.poll_interval);
        Self {
            client,
            store,
            ui,
            settings,
            timer,
            rows: RowBook::new(),
            selection: Selection::new(),
            recook_candidate: None,
            cycle: 0,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn timer(&self) -> &PollTimer {
        &self.timer
    }

    pub fn rows(&self) -> &RowBook {
        &self.rows
    }

    pub fn recook_candidate(&self) -> Option<TaskKey> {
        self.recook_candidate.as_ref().map(CookingTask::key)
    }

    /// Current tasks as the presentation layer would list them.
    pub fn view(&self) -> TrackerViewModel {
        let tasks = self.store.load();
        TrackerViewModel::new(&tasks, |key| self.selection.contains(key))
    }

    pub async fn submit(&mut self, request: SubmitRequest) -> SubmitOutcome {
        let email = match normalize_email(request.email.as_deref()) {
            Ok(email) => email,
            Err(err) => {
                tracker_info!("Rejected cook request for {}: {}", request.key, err);
                self.ui.apply(Effect::PromptInvalidEmail { email: err.0 });
                return SubmitOutcome::InvalidEmail;
            }
        };

        let key = request.key.clone();
        if self.store.load().contains(&key) {
            tracker_debug!("{} is already tracked", key);
            self.ui.apply(Effect::DismissCookPrompt);
            return SubmitOutcome::AlreadyTracked;
        }

        let cook = CookRequest::new(key.clone(), email.clone());
        let outcome = match self.client.request_cook(&cook).await {
            Ok(()) => {
                let mut task = CookingTask::new(key.clone());
                task.email = email;
                task.origin = request.origin;
                task.path = request.path;
                task.browse_url = request.browse_url;

                let mut tasks = self.store.load();
                if tasks.insert(task) {
                    self.persist(&tasks);
                }
                tracker_info!("Cook request for {} accepted", key);
                self.ui.apply(Effect::Notify(Notice::CookSubmitted {
                    key,
                    task_list_url: self.settings.task_list_url.clone(),
                }));
                SubmitOutcome::Submitted
            }
            Err(err) => {
                tracker_warn!("Cook request for {} failed: {}", key, err);
                self.ui.apply(Effect::Notify(Notice::CookFailed {
                    key,
                    reason: err.to_string(),
                }));
                SubmitOutcome::Failed(err)
            }
        };
        self.ui.apply(Effect::DismissCookPrompt);
        outcome
    }

    /// One reconciliation pass. Always leaves the timer armed for the next one.
    pub async fn poll_cycle(&mut self) -> CycleOutcome {
        self.cycle += 1;
        set_poll_cycle(self.cycle);
        self.timer.cancel();

        let tasks = self.store.load();
        if tasks.is_empty() {
            self.selection.select_all(&tasks, false);
            let cleared = self.rows.clear();
            self.emit(cleared);
            self.recook_candidate = None;
            self.timer.schedule();
            return CycleOutcome::Idle;
        }

        let in_flight = tasks.in_flight();
        self.selection.retain_tracked(&tasks);
        let pruned = self.rows.prune(&tasks);
        self.emit(pruned);

        let client = &self.client;
        let results = join_all(in_flight.iter().map(|key| async move {
            (key.clone(), client.cook_status(key).await)
        }))
        .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut failures = 0;
        for (key, result) in results {
            match result {
                Ok(update) => reports.push((key, update)),
                Err(err) => {
                    failures += 1;
                    tracker_warn!("Status request for {} failed: {}", key, err);
                }
            }
        }

        // Re-read: tasks may have been removed or added while we were waiting.
        let mut tasks = self.store.load();
        let merged = tasks.merge(reports);
        if merged.missing > 0 {
            tracker_debug!("{} polled tasks were removed meanwhile", merged.missing);
        }
        if merged.rejected > 0 {
            tracker_debug!("{} status reports would have moved a task backwards", merged.rejected);
        }

        self.selection.retain_tracked(&tasks);
        let effects = self.rows.sync(&tasks, &self.selection);
        self.emit(effects);
        self.persist(&tasks);
        self.timer.schedule();

        tracker_debug!(
            "Polled {} tasks: {} merged, {} failed",
            in_flight.len(),
            merged.applied,
            failures
        );
        CycleOutcome::Completed {
            polled: in_flight.len(),
            merged,
            failures,
        }
    }

    /// The window regained focus: catch up immediately.
    pub async fn on_focus(&mut self) -> CycleOutcome {
        self.timer.cancel();
        self.poll_cycle().await
    }

    /// User clicked "Download" on a finished task.
    pub async fn fetch_cooked_object(&mut self, fetch_url: &str) -> FetchOutcome {
        match self.client.probe(fetch_url).await {
            Ok(LinkState::Alive) => {
                self.ui.apply(Effect::StartDownload {
                    url: fetch_url.to_string(),
                });
                FetchOutcome::Downloading
            }
            Ok(LinkState::Dead { status }) => {
                let tasks = self.store.load();
                match tasks.find_by_fetch_url(fetch_url) {
                    Some(task) => {
                        let key = task.key();
                        tracker_info!("Bundle of {} is gone (http {})", key, status);
                        self.recook_candidate = Some(task.clone());
                        self.ui.apply(Effect::PromptRecook { key: key.clone() });
                        FetchOutcome::RecookOffered(key)
                    }
                    None => {
                        tracker_warn!("Dead link {} belongs to no tracked task", fetch_url);
                        self.ui.apply(Effect::Notify(Notice::DownloadUnreachable {
                            url: fetch_url.to_string(),
                            reason: format!("http status {status}"),
                        }));
                        FetchOutcome::DeadUntracked
                    }
                }
            }
            Err(err) => {
                tracker_warn!("Probe of {} failed: {}", fetch_url, err);
                self.ui.apply(Effect::Notify(Notice::DownloadUnreachable {
                    url: fetch_url.to_string(),
                    reason: err.to_string(),
                }));
                FetchOutcome::Unreachable(err)
            }
        }
    }

    /// User declined the recook prompt.
    pub fn decline_recook(&mut self) {
        self.recook_candidate = None;
    }

    /// User confirmed the recook prompt.
    pub async fn recook_object(&mut self) -> RecookOutcome {
        let Some(candidate) = self.recook_candidate.take() else {
            tracker_debug!("Recook requested without a candidate");
            return RecookOutcome::NoCandidate;
        };
        self.timer.cancel();

        let key = candidate.key();
        let request = CookRequest::new(key.clone(), candidate.email.clone());
        match self.client.request_cook(&request).await {
            Ok(()) => {
                let mut tasks = self.store.load();
                if tasks.reset_for_recook(&key) {
                    self.persist(&tasks);
                } else {
                    tracker_debug!("{} was removed or is already in flight", key);
                }
                tracker_info!("Recook of {} accepted", key);
                self.ui.apply(Effect::Notify(Notice::RecookSubmitted { key: key.clone() }));
                self.poll_cycle().await;
                RecookOutcome::Resubmitted(key)
            }
            Err(err) => {
                tracker_warn!("Recook of {} failed: {}", key, err);
                self.ui.apply(Effect::Notify(Notice::RecookFailed {
                    key: key.clone(),
                    reason: err.to_string(),
                }));
                self.timer.schedule();
                RecookOutcome::Failed(key, err)
            }
        }
    }

    /// Stops tracking `key`. Removing an untracked key is a no-op.
    pub fn remove_task(&mut self, key: &TaskKey) -> bool {
        let removed = self.remove_tasks(std::slice::from_ref(key));
        removed == 1
    }

    /// The bulk "remove selected" action.
    pub fn remove_selected(&mut self) -> usize {
        let keys = self.selection.take();
        self.remove_tasks(&keys)
    }

    fn remove_tasks(&mut self, keys: &[TaskKey]) -> usize {
        let mut tasks = self.store.load();
        let removed = keys
            .iter()
            .filter(|key| tasks.remove(key).is_some())
            .count();
        if removed > 0 {
            self.persist(&tasks);
        }
        for key in keys {
            self.selection.deselect(key);
            if self
                .recook_candidate
                .as_ref()
                .is_some_and(|candidate| candidate.has_key(key))
            {
                self.recook_candidate = None;
            }
            if let Some(effect) = self.rows.remove(key) {
                self.ui.apply(effect);
            }
        }
        removed
    }

    pub fn toggle_selected(&mut self, key: &TaskKey) -> bool {
        let tasks = self.store.load();
        let selected = self.selection.toggle(key, &tasks);
        let effects = self.rows.sync(&tasks, &self.selection);
        self.emit(effects);
        selected
    }

    /// The "select all" checkbox.
    pub fn select_all(&mut self, selected: bool) {
        let tasks = self.store.load();
        self.selection.select_all(&tasks, selected);
        let effects = self.rows.sync(&tasks, &self.selection);
        self.emit(effects);
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    fn emit(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.ui.apply(effect);
        }
    }

    fn persist(&self, tasks: &TaskList) {
        if let Err(err) = self.store.save(tasks) {
            tracker_error!("Failed to persist {} tasks: {}", tasks.len(), err);
        }
    }
}
