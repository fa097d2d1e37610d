use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Base URL of the document store REST endpoint. Unset means offline only.
  pub url: Option<String>,
  /// Root collection holding every named document
  #[serde(default = "default_root")]
  pub root: String,
  /// Single deadline for connecting and probing the store
  #[serde(default = "default_connect_timeout_ms")]
  pub connect_timeout_ms: u64,
  /// How often the live subscription polls for remote changes
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      url: None,
      root: default_root(),
      connect_timeout_ms: default_connect_timeout_ms(),
      poll_interval_ms: default_poll_interval_ms(),
    }
  }
}

impl RemoteConfig {
  pub fn connect_timeout(&self) -> Duration {
    Duration::from_millis(self.connect_timeout_ms)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// SQLite file for the local cache (defaults to the user data directory)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Also merge every changed collection into the aggregate document so other
  /// sessions' subscriptions see it.
  #[serde(default = "default_true")]
  pub mirror_aggregate: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      mirror_aggregate: true,
    }
  }
}

fn default_root() -> String {
  "websiteData".to_string()
}

fn default_connect_timeout_ms() -> u64 {
  5_000
}

fn default_poll_interval_ms() -> u64 {
  2_000
}

fn default_true() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sitecms.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sitecms/config.yaml
  ///
  /// Without any file the built-in defaults apply, which run offline only.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sitecms.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sitecms").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Get the remote store bearer token from the environment, if any.
  ///
  /// Checks SITECMS_REMOTE_TOKEN.
  pub fn get_remote_token() -> Option<String> {
    std::env::var("SITECMS_REMOTE_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }

  /// Directory for the log file and the default cache database.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("sitecms"))
  }
}
