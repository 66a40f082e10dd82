use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker_logging::tracker_debug;
use url::Url;

use super::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "cooktrack.ron";
const DEFAULT_BASE_URL: &str = "https://archive.softwareheritage.org/";
const DEFAULT_API_ROOT: &str = "api/1/vault/";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid base url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("poll_interval_secs must be at least 1")]
    PollInterval,
}

/// Contents of `cooktrack.ron`. Every field may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub api_root: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub state_dir: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub csrf_token: Option<String>,
    pub task_list_url: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Reads `path`. A missing file is only an error when `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                tracker_debug!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Effective settings: defaults, then the config file, then CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: Url,
    pub api_root: String,
    pub poll_interval: Duration,
    pub state_dir: PathBuf,
    pub download_dir: PathBuf,
    pub csrf_token: Option<String>,
    pub task_list_url: Option<String>,
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
}

impl AppConfig {
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path, true)?,
            None => FileConfig::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };
        Self::merge(file, cli)
    }

    fn merge(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let raw_url = cli
            .base_url
            .clone()
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw_url).map_err(|source| ConfigError::BaseUrl {
            url: raw_url.clone(),
            source,
        })?;

        let poll_interval_secs = file.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if poll_interval_secs == 0 {
            return Err(ConfigError::PollInterval);
        }

        let task_list_url = file
            .task_list_url
            .or_else(|| base_url.join("browse/vault/").ok().map(String::from));

        Ok(Self {
            api_root: file.api_root.unwrap_or_else(|| DEFAULT_API_ROOT.to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            state_dir: cli
                .state_dir
                .clone()
                .or(file.state_dir)
                .unwrap_or_else(|| PathBuf::from(".cooktrack")),
            download_dir: file.download_dir.unwrap_or_else(|| PathBuf::from("downloads")),
            csrf_token: file.csrf_token,
            task_list_url,
            log_file: file.log_file,
            verbose: cli.verbose,
            base_url,
        })
    }
}
