//! Pipeline configuration threaded through every component.
//!
//! A single [`PipelineConfig`] is constructed at process start (from an
//! optional `config.toml` in the app root, with defaults from
//! [`crate::app_dirs`]) and passed into constructors. Components never read
//! globals or the environment themselves.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};

/// Default confidence threshold above which a classifier verdict counts as spam.
pub const DEFAULT_SPAM_THRESHOLD: f64 = 0.5;
/// Default pairwise-similarity threshold for tag cluster membership.
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.5;
/// Default similarity threshold for gazetteer matches against canon.
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.5;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to resolve application directory: {0}")]
    AppDir(#[from] AppDirError),
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolved configuration for a curation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// SQLite database holding spam-status and tag records.
    pub db_path: PathBuf,
    /// Directory where model weights, encoder state, and metrics live.
    pub artifact_dir: PathBuf,
    /// Spam threshold applied to the text classifier's confidence.
    pub text_threshold: f64,
    /// Spam threshold applied to the user/metadata classifier's confidence.
    pub user_threshold: f64,
    /// Pairwise-similarity threshold for tag clustering.
    pub cluster_threshold: f64,
    /// Similarity threshold for gazetteer matching.
    pub search_threshold: f64,
}

/// On-disk `config.toml` shape; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    text_threshold: Option<f64>,
    user_threshold: Option<f64>,
    cluster_threshold: Option<f64>,
    search_threshold: Option<f64>,
}

impl PipelineConfig {
    /// Load configuration from `config.toml` in the app root, falling back to
    /// platform defaults for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        let root = app_dirs::app_root_dir()?;
        let file = read_config_file(&root.join("config.toml"))?;
        Self::from_file(file)
    }

    /// Build a config rooted at an explicit directory, for tests and
    /// portable setups. No config file is consulted.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            db_path: dir.join("curation.db"),
            artifact_dir: dir.join("artifacts"),
            text_threshold: DEFAULT_SPAM_THRESHOLD,
            user_threshold: DEFAULT_SPAM_THRESHOLD,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            search_threshold: DEFAULT_SEARCH_THRESHOLD,
        }
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let db_path = match file.db_path {
            Some(path) => path,
            None => app_dirs::default_db_path()?,
        };
        let artifact_dir = match file.artifact_dir {
            Some(path) => path,
            None => app_dirs::artifacts_dir()?,
        };
        Ok(Self {
            db_path,
            artifact_dir,
            text_threshold: file.text_threshold.unwrap_or(DEFAULT_SPAM_THRESHOLD),
            user_threshold: file.user_threshold.unwrap_or(DEFAULT_SPAM_THRESHOLD),
            cluster_threshold: file.cluster_threshold.unwrap_or(DEFAULT_CLUSTER_THRESHOLD),
            search_threshold: file.search_threshold.unwrap_or(DEFAULT_SEARCH_THRESHOLD),
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.is_file() {
        return Ok(ConfigFile::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
