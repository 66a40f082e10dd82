use std::collections::BTreeSet;

use crate::{Effect, TaskKey, TaskList, TaskRowView};

/// Keys of the rows currently drawn by the presentation layer.
///
/// After [`RowBook::sync`] the rendered set equals the set of tasks passed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBook {
    rendered: BTreeSet<TaskKey>,
}

impl RowBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_rendered(&self, key: &TaskKey) -> bool {
        self.rendered.contains(key)
    }

    pub fn rendered(&self) -> impl Iterator<Item = &TaskKey> {
        self.rendered.iter()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// Drops rows whose task is gone from `tasks`.
    pub fn prune(&mut self, tasks: &TaskList) -> Vec<Effect> {
        let orphans: Vec<TaskKey> = self
            .rendered
            .iter()
            .filter(|key| !tasks.contains(key))
            .cloned()
            .collect();
        orphans
            .into_iter()
            .map(|key| {
                self.rendered.remove(&key);
                Effect::RemoveRow(key)
            })
            .collect()
    }

    /// Removes a single row, if drawn.
    pub fn remove(&mut self, key: &TaskKey) -> Option<Effect> {
        self.rendered
            .remove(key)
            .then(|| Effect::RemoveRow(key.clone()))
    }

    pub fn clear(&mut self) -> Vec<Effect> {
        if self.rendered.is_empty() {
            return Vec::new();
        }
        self.rendered.clear();
        vec![Effect::ClearRows]
    }

    /// Brings the drawn rows in line with `tasks`: orphans are removed, new tasks
    /// get a row, existing rows are refreshed.
    pub fn sync(&mut self, tasks: &TaskList, selection: &Selection) -> Vec<Effect> {
        let mut effects = self.prune(tasks);
        effects.reserve(tasks.len());
        for task in tasks {
            let key = task.key();
            let row = TaskRowView::new(task, selection.contains(&key));
            if self.rendered.insert(key) {
                effects.push(Effect::InsertRow(row));
            } else {
                effects.push(Effect::UpdateRow(row));
            }
        }
        effects
    }
}

/// Rows ticked for the bulk "remove selected" action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: BTreeSet<TaskKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Flips one row; returns the new selection state. Untracked keys stay unselected.
    pub fn toggle(&mut self, key: &TaskKey, tasks: &TaskList) -> bool {
        if self.keys.remove(key) {
            return false;
        }
        if tasks.contains(key) {
            self.keys.insert(key.clone());
            return true;
        }
        false
    }

    /// The "select all" checkbox.
    pub fn select_all(&mut self, tasks: &TaskList, selected: bool) {
        self.keys.clear();
        if selected {
            self.keys.extend(tasks.iter().map(|task| task.key()));
        }
    }

    pub fn deselect(&mut self, key: &TaskKey) {
        self.keys.remove(key);
    }

    /// Forgets keys whose task no longer exists.
    pub fn retain_tracked(&mut self, tasks: &TaskList) {
        self.keys.retain(|key| tasks.contains(key));
    }

    pub fn take(&mut self) -> Vec<TaskKey> {
        std::mem::take(&mut self.keys).into_iter().collect()
    }
}
