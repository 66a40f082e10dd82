use std::fmt;
use std::io::Write;

use cooking_core::{Effect, Notice, ProgressColor, TaskKey, TaskRowView};
use cooking_engine::UiSink;
use thiserror::Error;

/// Text presentation of the task list.
///
/// Rows keep the order in which they were first drawn; the 1-based position
/// is what the `fetch`, `toggle` and `remove` commands refer to.
pub struct ConsoleUi<W: Write> {
    out: W,
    rows: Vec<TaskRowView>,
    echo_rows: bool,
    downloads: Vec<String>,
    recook_prompt: Option<TaskKey>,
}

impl<W: Write> ConsoleUi<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows: Vec::new(),
            echo_rows: false,
            downloads: Vec::new(),
            recook_prompt: None,
        }
    }

    /// Print rows as soon as they appear or change.
    pub fn set_echo_rows(&mut self, echo: bool) {
        self.echo_rows = echo;
    }

    /// Row at the 1-based `position`.
    pub fn row(&self, position: usize) -> Option<&TaskRowView> {
        position.checked_sub(1).and_then(|index| self.rows.get(index))
    }

    pub fn take_downloads(&mut self) -> Vec<String> {
        std::mem::take(&mut self.downloads)
    }

    pub fn take_recook_prompt(&mut self) -> Option<TaskKey> {
        self.recook_prompt.take()
    }

    pub fn say(&mut self, line: impl fmt::Display) {
        let _ = writeln!(self.out, "{line}");
    }

    pub fn print_table(&mut self) {
        if self.rows.is_empty() {
            self.say("No cooking tasks tracked.");
            return;
        }
        let lines: Vec<String> = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| format_row(index + 1, row))
            .collect();
        for line in lines {
            self.say(line);
        }
    }

    fn position_of(&self, key: &TaskKey) -> Option<usize> {
        self.rows.iter().position(|row| row.key == *key)
    }

    fn echo(&mut self, position: usize) {
        if !self.echo_rows {
            return;
        }
        if let Some(row) = self.rows.get(position) {
            let line = format_row(position + 1, row);
            self.say(line);
        }
    }
}

impl<W: Write> UiSink for ConsoleUi<W> {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::InsertRow(row) => {
                self.rows.push(row);
                self.echo(self.rows.len() - 1);
            }
            Effect::UpdateRow(row) => match self.position_of(&row.key) {
                Some(position) if self.rows[position] != row => {
                    self.rows[position] = row;
                    self.echo(position);
                }
                Some(_) => {}
                None => self.rows.push(row),
            },
            Effect::RemoveRow(key) => {
                if let Some(position) = self.position_of(&key) {
                    self.rows.remove(position);
                    if self.echo_rows {
                        self.say(format_args!("Stopped tracking {key}"));
                    }
                }
            }
            Effect::ClearRows => self.rows.clear(),
            Effect::Notify(notice) => self.say(describe_notice(&notice)),
            Effect::PromptInvalidEmail { email } => {
                self.say(format_args!("{email:?} is not a valid email address."));
            }
            Effect::PromptRecook { key } => {
                self.say(format_args!(
                    "The bundle of {key} is no longer available. Cook it again? (yes/no)"
                ));
                self.recook_prompt = Some(key);
            }
            Effect::DismissCookPrompt => {}
            Effect::StartDownload { url } => self.downloads.push(url),
        }
    }
}

fn progress_marker(color: ProgressColor, animated: bool) -> &'static str {
    match (color, animated) {
        (ProgressColor::Blue, true) => "[~~~~]",
        (ProgressColor::Blue, false) => "[....]",
        (ProgressColor::Gray, _) => "[    ]",
        (ProgressColor::Green, _) => "[####]",
        (ProgressColor::Red, _) => "[ !! ]",
    }
}

pub(crate) fn format_row(position: usize, row: &TaskRowView) -> String {
    let check = if row.selected { "[x]" } else { "[ ]" };
    let mut line = format!(
        "{:>3}. {} {:<8} {} {} {}",
        position,
        check,
        row.bundle_type().label(),
        row.key.swhid,
        progress_marker(row.progress.color, row.progress.animated),
        row.progress.label
    );
    match (&row.origin, &row.path) {
        (Some(origin), Some(path)) => line.push_str(&format!("  ({origin} {path})")),
        (Some(origin), None) => line.push_str(&format!("  ({origin})")),
        (None, Some(path)) => line.push_str(&format!("  ({path})")),
        (None, None) => {}
    }
    if row.download_url.is_some() {
        line.push_str("  download ready");
    }
    line
}

fn describe_notice(notice: &Notice) -> String {
    match notice {
        Notice::CookSubmitted { key, task_list_url } => match task_list_url {
            Some(url) => format!("Cooking of {key} requested. Follow its progress at {url}"),
            None => format!("Cooking of {key} requested."),
        },
        Notice::CookFailed { key, reason } => {
            format!("Cooking of {key} could not be requested: {reason}")
        }
        Notice::RecookSubmitted { key } => format!("Cooking of {key} requested again."),
        Notice::RecookFailed { key, reason } => {
            format!("Cooking of {key} could not be requested again: {reason}")
        }
        Notice::DownloadUnreachable { url, reason } => {
            format!("Bundle {url} cannot be downloaded: {reason}")
        }
    }
}

/// A line typed at the `watch` prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Refresh,
    List,
    Fetch(usize),
    Confirm,
    Decline,
    Toggle(usize),
    SelectAll,
    SelectNone,
    Remove(usize),
    RemoveSelected,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized command {0:?}; type `help`")]
pub struct UnknownCommand(pub String);

pub const HELP: &str = "\
commands:
  refresh            poll now
  list               print the task table
  fetch N            download the bundle of row N
  yes | no           answer the recook question
  toggle N           select or deselect row N
  select all|none    select or clear every row
  remove N           stop tracking row N
  remove selected    stop tracking every selected row
  quit";

impl std::str::FromStr for ConsoleCommand {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let unknown = || UnknownCommand(line.trim().to_string());
        let position = |raw: &str| raw.parse::<usize>().ok().filter(|n| *n > 0);

        let command = match words.as_slice() {
            ["refresh"] | ["r"] => ConsoleCommand::Refresh,
            ["list"] | ["ls"] => ConsoleCommand::List,
            ["fetch", n] => ConsoleCommand::Fetch(position(*n).ok_or_else(unknown)?),
            ["yes"] | ["y"] => ConsoleCommand::Confirm,
            ["no"] | ["n"] => ConsoleCommand::Decline,
            ["toggle", n] => ConsoleCommand::Toggle(position(*n).ok_or_else(unknown)?),
            ["select", "all"] => ConsoleCommand::SelectAll,
            ["select", "none"] => ConsoleCommand::SelectNone,
            ["remove", "selected"] => ConsoleCommand::RemoveSelected,
            ["remove", n] => ConsoleCommand::Remove(position(*n).ok_or_else(unknown)?),
            ["help"] | ["?"] => ConsoleCommand::Help,
            ["quit"] | ["q"] | ["exit"] => ConsoleCommand::Quit,
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use cooking_core::{BundleType, CookingTask, StatusUpdate, TaskList, TaskStatus};
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(swhid: &str, status: TaskStatus) -> TaskRowView {
        let key = TaskKey::new(BundleType::Flat, swhid);
        let mut tasks = TaskList::from_tasks([CookingTask::new(key.clone())]);
        let mut update = StatusUpdate::new(status);
        if status == TaskStatus::Done {
            update = update.with_fetch_url("https://vault/abc.tar.gz");
        }
        tasks.apply_update(&key, update);
        TaskRowView::new(tasks.get(&key).unwrap(), false)
    }

    fn printed(ui: ConsoleUi<Vec<u8>>) -> String {
        String::from_utf8(ui.out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!("fetch 2".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Fetch(2)));
        assert_eq!("  remove selected ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::RemoveSelected));
        assert_eq!("remove 3".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Remove(3)));
        assert_eq!("select none".parse::<ConsoleCommand>(), Ok(ConsoleCommand::SelectNone));
        assert_eq!("y".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Confirm));
        assert_eq!(
            "fetch 0".parse::<ConsoleCommand>(),
            Err(UnknownCommand("fetch 0".to_string()))
        );
        assert!("dance".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn rows_keep_first_drawn_order() {
        let mut ui = ConsoleUi::new(Vec::new());
        ui.apply(Effect::InsertRow(row("swh:1:dir:a", TaskStatus::New)));
        ui.apply(Effect::InsertRow(row("swh:1:dir:b", TaskStatus::New)));
        ui.apply(Effect::UpdateRow(row("swh:1:dir:a", TaskStatus::Done)));

        assert_eq!(ui.row(1).unwrap().key.swhid, "swh:1:dir:a");
        assert_eq!(ui.row(1).unwrap().status, TaskStatus::Done);
        assert_eq!(ui.row(2).unwrap().key.swhid, "swh:1:dir:b");
        assert!(ui.row(0).is_none());

        ui.apply(Effect::RemoveRow(TaskKey::new(BundleType::Flat, "swh:1:dir:a")));
        assert_eq!(ui.row(1).unwrap().key.swhid, "swh:1:dir:b");
    }

    #[test]
    fn echo_prints_only_changes() {
        let mut ui = ConsoleUi::new(Vec::new());
        ui.set_echo_rows(true);
        ui.apply(Effect::InsertRow(row("swh:1:dir:a", TaskStatus::Pending)));
        ui.apply(Effect::UpdateRow(row("swh:1:dir:a", TaskStatus::Pending)));
        ui.apply(Effect::UpdateRow(row("swh:1:dir:a", TaskStatus::Done)));

        let out = printed(ui);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[~~~~] pending"));
        assert!(lines[1].contains("[####] done"));
        assert!(lines[1].ends_with("download ready"));
    }

    #[test]
    fn prompts_and_downloads_are_queued() {
        let mut ui = ConsoleUi::new(Vec::new());
        let key = TaskKey::new(BundleType::GitBare, "swh:1:rev:abc");
        ui.apply(Effect::PromptRecook { key: key.clone() });
        ui.apply(Effect::StartDownload {
            url: "https://vault/abc.git.tar".to_string(),
        });

        assert_eq!(ui.take_recook_prompt(), Some(key));
        assert_eq!(ui.take_recook_prompt(), None);
        assert_eq!(ui.take_downloads(), vec!["https://vault/abc.git.tar".to_string()]);
        assert!(printed(ui).contains("Cook it again?"));
    }

    #[test]
    fn formats_a_row() {
        let mut view = row("swh:1:dir:abc", TaskStatus::Failed);
        view.origin = Some("https://github.com/example/repo".to_string());
        view.selected = true;
        assert_eq!(
            format_row(4, &view),
            format!(
                "  4. [x] {:<8} swh:1:dir:abc [ !! ] failed  (https://github.com/example/repo)",
                BundleType::Flat.label()
            )
        );
    }
}
