//! Configuration loading and data directory resolution.
//!
//! Precedence, highest first: command-line flags (or their environment
//! variables), the TOML config file, then compiled defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::auth::StaticCredentials;
use crate::store::{JsonFiles, DEFAULT_HISTORY_LIMIT};

/// Config file name looked up inside the platform config directory.
const CONFIG_FILE_NAME: &str = "config.toml";
/// Used when the platform offers no data directory (no home, for example).
const FALLBACK_DATA_DIR: &str = "library-data";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the JSON files, the CSV export and the log file.
    pub data_dir: PathBuf,
    pub books_file: PathBuf,
    pub members_file: PathBuf,
    pub export_file: PathBuf,
    /// How many history lines the history view shows.
    pub history_limit: usize,
    pub auth: StaticCredentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            books_file: PathBuf::from("library_data.json"),
            members_file: PathBuf::from("members_data.json"),
            export_file: PathBuf::from("library_export.csv"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            auth: StaticCredentials::default(),
        }
    }
}

impl Config {
    /// Load the config from `explicit_path` if given, otherwise from the
    /// platform config directory. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        match path {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) if explicit_path.is_some() => {
                anyhow::bail!("config file {} does not exist", path.display())
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        Ok(config)
    }

    /// Apply a `--data-dir` style override.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn books_path(&self) -> PathBuf {
        self.resolve(&self.books_file)
    }

    pub fn members_path(&self) -> PathBuf {
        self.resolve(&self.members_file)
    }

    pub fn export_path(&self) -> PathBuf {
        self.resolve(&self.export_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("library.log")
    }

    /// Persistence backend for the configured file locations.
    pub fn json_files(&self) -> JsonFiles {
        JsonFiles::new(self.books_path(), self.members_path())
    }

    /// Make sure the data directory exists before anything writes into it.
    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("failed to create data directory {}", self.data_dir.display())
        })
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "digital-library", "library")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
