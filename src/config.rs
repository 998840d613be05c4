use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  /// Company used when none is given on the command line
  pub company_id: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  pub base_url: String,
  /// Per-request timeout for remote calls
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Honor HTTP(S)_PROXY from the environment
  #[serde(default = "default_true")]
  pub system_proxy: bool,
}

fn default_timeout_secs() -> u64 {
  15
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Database file (defaults to $XDG_DATA_HOME/shiftsync/cache.db)
  pub path: Option<PathBuf>,
  /// Shift weeks that ended longer ago than this are evicted by `prune`
  #[serde(default = "default_retention_days")]
  pub retention_days: u64,
  /// Run concurrent syncs of the same scope one after the other
  #[serde(default = "default_true")]
  pub serialize_scopes: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      retention_days: default_retention_days(),
      serialize_scopes: true,
    }
  }
}

fn default_retention_days() -> u64 {
  90
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// tracing filter directive, overridden by SHIFTSYNC_LOG
  #[serde(default = "default_log_filter")]
  pub filter: String,
  /// Log directory (defaults to $XDG_DATA_HOME/shiftsync/logs)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      filter: default_log_filter(),
      directory: None,
    }
  }
}

fn default_log_filter() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shiftsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shiftsync/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/shiftsync/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("shiftsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shiftsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Get the remote API token from the environment, if set.
  ///
  /// Checks SHIFTSYNC_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    std::env::var("SHIFTSYNC_API_TOKEN")
      .ok()
      .filter(|token| !token.is_empty())
  }
}
