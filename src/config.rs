// YAML configuration: which blob backend to use and where it lives

use crate::blob::{self, BlobStore, FileBlobStore, SqliteBlobStore};
use crate::store::DEFAULT_KEY;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const APP_DIR: &str = "todostore";
const CONFIG_FILE: &str = "config.yml";
const SQLITE_FILE: &str = "todostore.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            _ => Err(format!("Unknown backend: {} (expected file or sqlite)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub key: String,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: default_data_dir(),
            key: DEFAULT_KEY.to_string(),
            color: true,
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and silently skipped when missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(eyre!("Config file not found: {:?}", path));
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_yaml(&content).with_context(|| format!("Invalid config file {:?}", path))?;
        debug!(path = ?path, backend = %config.backend, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Config = serde_yaml::from_str(content).context("Failed to parse YAML config")?;
        config.data_dir = expand_home(&config.data_dir);
        blob::validate_key(&config.key)?;
        Ok(config)
    }

    /// `<config dir>/todostore/config.yml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Open the configured blob store
    pub fn open_blob_store(&self) -> Result<Box<dyn BlobStore>> {
        match self.backend {
            Backend::File => Ok(Box::new(FileBlobStore::open(&self.data_dir)?)),
            Backend::Sqlite => Ok(Box::new(SqliteBlobStore::open(self.data_dir.join(SQLITE_FILE))?)),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
