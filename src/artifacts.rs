//! Keyed JSON artifact store for model weights, encoder state, and metrics.
//!
//! Classifiers and encoders persist their fitted state through this seam so
//! the storage mechanism stays swappable without touching model logic. Keys
//! map to `<artifact_dir>/<key>.json`.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Errors raised by artifact reads and writes.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create artifact directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write artifact {key}: {source}")]
    Write {
        key: String,
        source: std::io::Error,
    },
    #[error("Failed to read artifact {key}: {source}")]
    Read {
        key: String,
        source: std::io::Error,
    },
    #[error("Artifact {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    #[error("Metrics unavailable for {0}: train first")]
    MetricsUnavailable(String),
}

/// Save/load JSON documents by key under a fixed directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when an artifact exists for the key.
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Serialize `value` as pretty JSON under the key, creating the
    /// directory on first use.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ArtifactError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        std::fs::write(self.path_for(key), bytes).map_err(|source| ArtifactError::Write {
            key: key.to_string(),
            source,
        })
    }

    /// Load and deserialize the artifact stored under the key.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T, ArtifactError> {
        let bytes =
            std::fs::read(self.path_for(key)).map_err(|source| ArtifactError::Read {
                key: key.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Corrupt {
            key: key.to_string(),
            source,
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}
