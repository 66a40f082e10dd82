use std::io::{self, Stdout};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use cooking_core::{TaskKey, TaskStatus};
use cooking_engine::{
    sleep_until_due, CookingTracker, FetchOutcome, FileTaskStore, RecookOutcome,
    ReqwestVaultClient, SubmitOutcome, SubmitRequest, TaskStore, TrackerSettings, VaultSettings,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracker_logging::{tracker_info, tracker_warn};

use super::cli::{Cli, Command, Target};
use super::config::AppConfig;
use super::console::{ConsoleCommand, ConsoleUi, HELP};
use super::logging::{self, LogDestination};

type AppTracker = CookingTracker<ReqwestVaultClient, FileTaskStore, ConsoleUi<Stdout>>;
type InputLines = Lines<BufReader<Stdin>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(&cli).context("loading configuration")?;
    logging::initialize(
        LogDestination::for_log_file(config.log_file.as_deref()),
        config.verbose,
    );
    tracker_info!(
        "cooktrack {} against {} (state in {:?})",
        env!("CARGO_PKG_VERSION"),
        config.base_url,
        config.state_dir
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    runtime.block_on(dispatch(cli.command, config))
}

fn build_tracker(config: &AppConfig) -> anyhow::Result<AppTracker> {
    let mut settings = VaultSettings::new(config.base_url.clone());
    settings.api_root = config.api_root.clone();
    settings.csrf_token = config.csrf_token.clone();
    let client = ReqwestVaultClient::new(settings).context("building the vault client")?;

    let store = FileTaskStore::new(&config.state_dir);
    let tracker_settings = TrackerSettings {
        poll_interval: config.poll_interval,
        task_list_url: config.task_list_url.clone(),
    };
    Ok(CookingTracker::new(
        client,
        store,
        ConsoleUi::new(io::stdout()),
        tracker_settings,
    ))
}

async fn dispatch(command: Command, config: AppConfig) -> anyhow::Result<()> {
    let mut tracker = build_tracker(&config)?;
    match command {
        Command::Cook {
            target,
            email,
            origin,
            path,
            browse_url,
        } => {
            let mut request = SubmitRequest::new(target.bundle_type, target.swhid.trim());
            request.email = email;
            request.origin = origin;
            request.path = path;
            request.browse_url = browse_url;
            match tracker.submit(request).await {
                SubmitOutcome::Submitted => Ok(()),
                SubmitOutcome::AlreadyTracked => {
                    tracker
                        .ui_mut()
                        .say(format_args!("{} is already tracked.", target.key()));
                    Ok(())
                }
                SubmitOutcome::InvalidEmail => bail!("cook request not sent"),
                SubmitOutcome::Failed(err) => Err(err).context("cook request failed"),
            }
        }
        Command::List => {
            tracker.poll_cycle().await;
            tracker.ui_mut().print_table();
            Ok(())
        }
        Command::Watch => watch(&mut tracker, &config.download_dir).await,
        Command::Fetch { target, yes } => fetch(&mut tracker, &target, yes, &config.download_dir).await,
        Command::Remove { target } => {
            let key = target.key();
            if tracker.remove_task(&key) {
                tracker.ui_mut().say(format_args!("Stopped tracking {key}."));
            } else {
                tracker.ui_mut().say(format_args!("{key} is not tracked."));
            }
            Ok(())
        }
    }
}

async fn fetch(
    tracker: &mut AppTracker,
    target: &Target,
    assume_yes: bool,
    download_dir: &Path,
) -> anyhow::Result<()> {
    let key = target.key();
    let fetch_url = match ready_fetch_url(tracker, &key) {
        Some(url) => url,
        None => {
            // Stored state may be stale; ask the vault once before giving up.
            tracker.poll_cycle().await;
            ready_fetch_url(tracker, &key).ok_or_else(|| not_ready(tracker, &key))?
        }
    };

    match tracker.fetch_cooked_object(&fetch_url).await {
        FetchOutcome::Downloading => run_downloads(tracker, download_dir).await,
        FetchOutcome::RecookOffered(_) => {
            tracker.ui_mut().take_recook_prompt();
            let confirmed = if assume_yes {
                true
            } else {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                let answer = lines.next_line().await.context("reading the answer")?;
                matches!(
                    answer.as_deref().map(str::parse::<ConsoleCommand>),
                    Some(Ok(ConsoleCommand::Confirm))
                )
            };
            if confirmed {
                recook(tracker).await;
            } else {
                tracker.decline_recook();
            }
            Ok(())
        }
        FetchOutcome::DeadUntracked => bail!("{fetch_url} is gone"),
        FetchOutcome::Unreachable(err) => Err(err).context("download link unreachable"),
    }
}

fn ready_fetch_url(tracker: &AppTracker, key: &TaskKey) -> Option<String> {
    tracker
        .store()
        .load()
        .get(key)
        .filter(|task| task.status == TaskStatus::Done)
        .and_then(|task| task.fetch_url.clone())
}

fn not_ready(tracker: &AppTracker, key: &TaskKey) -> anyhow::Error {
    match tracker.store().load().get(key) {
        Some(task) => anyhow!("{key} is not ready yet ({})", task.status),
        None => anyhow!("{key} is not tracked; cook it first"),
    }
}

async fn recook(tracker: &mut AppTracker) {
    if tracker.recook_object().await == RecookOutcome::NoCandidate {
        tracker.ui_mut().say("Nothing to cook again.");
    }
}

async fn run_downloads(tracker: &mut AppTracker, download_dir: &Path) -> anyhow::Result<()> {
    for url in tracker.ui_mut().take_downloads() {
        tracker.ui_mut().say(format_args!("Downloading {url}"));
        let saved = tracker
            .client()
            .download_bundle(&url, download_dir)
            .await
            .with_context(|| format!("downloading {url}"))?;
        tracker.ui_mut().say(format_args!("Saved {}", saved.display()));
    }
    Ok(())
}

async fn watch(tracker: &mut AppTracker, download_dir: &Path) -> anyhow::Result<()> {
    tracker.poll_cycle().await;
    tracker.ui_mut().print_table();
    tracker.ui_mut().set_echo_rows(true);
    tracker.ui_mut().say("Type `help` for commands.");

    let mut lines: InputLines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let due = tracker.timer().due_at();
        tokio::select! {
            _ = sleep_until_due(due) => {
                tracker.poll_cycle().await;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                if handle_line(tracker, &line, download_dir).await == Flow::Quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }
    tracker_info!("Leaving watch mode");
    Ok(())
}

async fn handle_line(tracker: &mut AppTracker, line: &str, download_dir: &Path) -> Flow {
    let command = match line.parse::<ConsoleCommand>() {
        Ok(command) => command,
        Err(err) => {
            tracker.ui_mut().say(err);
            return Flow::Continue;
        }
    };

    match command {
        ConsoleCommand::Refresh => {
            tracker.on_focus().await;
        }
        ConsoleCommand::List => tracker.ui_mut().print_table(),
        ConsoleCommand::Fetch(position) => {
            let download_url = tracker
                .ui()
                .row(position)
                .map(|row| row.download_url.clone());
            match download_url {
                None => tracker.ui_mut().say(format_args!("There is no row {position}.")),
                Some(None) => tracker
                    .ui_mut()
                    .say(format_args!("Row {position} has no bundle to download yet.")),
                Some(Some(url)) => {
                    if tracker.fetch_cooked_object(&url).await == FetchOutcome::Downloading {
                        if let Err(err) = run_downloads(tracker, download_dir).await {
                            tracker_warn!("{:#}", err);
                            tracker.ui_mut().say(format_args!("{err:#}"));
                        }
                    }
                }
            }
        }
        ConsoleCommand::Confirm => {
            tracker.ui_mut().take_recook_prompt();
            recook(tracker).await;
        }
        ConsoleCommand::Decline => {
            tracker.ui_mut().take_recook_prompt();
            tracker.decline_recook();
        }
        ConsoleCommand::Toggle(position) => match row_key(tracker, position) {
            Some(key) => {
                tracker.toggle_selected(&key);
            }
            None => tracker.ui_mut().say(format_args!("There is no row {position}.")),
        },
        ConsoleCommand::SelectAll => tracker.select_all(true),
        ConsoleCommand::SelectNone => tracker.select_all(false),
        ConsoleCommand::Remove(position) => match row_key(tracker, position) {
            Some(key) => {
                tracker.remove_task(&key);
            }
            None => tracker.ui_mut().say(format_args!("There is no row {position}.")),
        },
        ConsoleCommand::RemoveSelected => {
            let removed = tracker.remove_selected();
            tracker.ui_mut().say(format_args!("Removed {removed} tasks."));
        }
        ConsoleCommand::Help => tracker.ui_mut().say(HELP),
        ConsoleCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn row_key(tracker: &AppTracker, position: usize) -> Option<TaskKey> {
    tracker.ui().row(position).map(|row| row.key.clone())
}
