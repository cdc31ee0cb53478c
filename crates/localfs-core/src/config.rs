//! Construction-time configuration for a [`Storage`](crate::Storage).
//!
//! All fields are optional so a TOML file, the environment and command-line
//! flags can each override a subset; effective values come from the accessor
//! methods, which apply defaults and bounds.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Work directory used when none is configured.
pub const DEFAULT_WORK_DIR: &str = "/";
/// Size of the raw directory-entry buffer used by listings.
pub const DEFAULT_LIST_BUFFER_SIZE: usize = 8192;
/// Smallest accepted listing buffer: one maximal dirent record must fit.
pub const MIN_LIST_BUFFER_SIZE: usize = 1024;
/// Environment variable overriding the work directory.
pub const WORK_DIR_ENV: &str = "LOCALFS_WORK_DIR";

/// Apply `Option`-field overrides from a source config onto a target config.
macro_rules! apply_option_overrides {
    ($src:expr, $dst:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(ref v) = $src.$field {
                $dst.$field = Some(v.clone());
            }
        )+
    };
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory all relative paths resolve against. Created if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Bytes read from the kernel per listing page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_buffer_size: Option<usize>,

    /// Whether listings follow symlinks by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_links: Option<bool>,
}

impl StorageConfig {
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: Some(work_dir.into()),
            ..Default::default()
        }
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config holding only what the environment sets.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var_os(WORK_DIR_ENV).map(PathBuf::from),
            ..Default::default()
        }
    }

    /// Overlay every field `other` sets onto `self`.
    pub fn merge(&mut self, other: &StorageConfig) {
        apply_option_overrides!(other, self, work_dir, list_buffer_size, follow_links);
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR))
    }

    #[inline]
    pub fn list_buffer_size(&self) -> usize {
        self.list_buffer_size
            .unwrap_or(DEFAULT_LIST_BUFFER_SIZE)
            .max(MIN_LIST_BUFFER_SIZE)
    }

    #[inline]
    pub fn follow_links(&self) -> bool {
        self.follow_links.unwrap_or(false)
    }
}
