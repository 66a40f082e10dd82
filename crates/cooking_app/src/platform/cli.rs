use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cooking_core::{BundleType, TaskKey};

/// Track Software Heritage vault cooking tasks from the terminal.
#[derive(Debug, Parser)]
#[command(name = "cooktrack", version, about)]
pub struct Cli {
    /// Configuration file (RON). Defaults to ./cooktrack.ron when present.
    #[arg(long, global = true, env = "COOKTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Archive instance, e.g. https://archive.softwareheritage.org/
    #[arg(long, global = true, env = "COOKTRACK_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory holding the persisted task list.
    #[arg(long, global = true, env = "COOKTRACK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask the vault to cook an object and start tracking it.
    Cook {
        #[command(flatten)]
        target: Target,
        /// Address notified when the bundle is ready.
        #[arg(long)]
        email: Option<String>,
        /// Origin the object was browsed from.
        #[arg(long)]
        origin: Option<String>,
        /// Path of the object inside its origin.
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        browse_url: Option<String>,
    },
    /// Refresh every tracked task once and print the list.
    List,
    /// Keep polling and accept commands on stdin.
    Watch,
    /// Download a finished bundle, offering a recook if its link expired.
    Fetch {
        #[command(flatten)]
        target: Target,
        /// Recook without asking when the link expired.
        #[arg(long)]
        yes: bool,
    },
    /// Stop tracking a task.
    Remove {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Debug, Clone, Args)]
pub struct Target {
    /// `flat` or `git_bare`.
    #[arg(value_parser = parse_bundle_type)]
    pub bundle_type: BundleType,
    /// SWHID of the object, e.g. swh:1:dir:<hash>.
    pub swhid: String,
}

impl Target {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.bundle_type, self.swhid.trim())
    }
}

fn parse_bundle_type(raw: &str) -> Result<BundleType, String> {
    raw.parse::<BundleType>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cook_with_global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "cooktrack",
            "cook",
            "git-bare",
            "swh:1:rev:abc",
            "--email",
            "dev@example.org",
            "--state-dir",
            "/tmp/state",
        ])
        .unwrap();

        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/state")));
        match cli.command {
            Command::Cook { target, email, .. } => {
                assert_eq!(target.key(), TaskKey::new(BundleType::GitBare, "swh:1:rev:abc"));
                assert_eq!(email.as_deref(), Some("dev@example.org"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_bundle_types() {
        let err = Cli::try_parse_from(["cooktrack", "remove", "gitfast", "swh:1:rev:abc"]);
        assert!(err.is_err());
    }

    #[test]
    fn fetch_accepts_yes() {
        let cli =
            Cli::try_parse_from(["cooktrack", "fetch", "flat", "swh:1:dir:abc", "--yes"]).unwrap();
        assert!(matches!(cli.command, Command::Fetch { yes: true, .. }));
    }
}
