use chrono::FixedOffset;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::TtlPolicy;
use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub apps_script: AppsScriptConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub report: ReportConfig,
  #[serde(default)]
  pub tasks: TasksConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppsScriptConfig {
  /// Deployed web app URL (`https://script.google.com/macros/s/.../exec`)
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// When false every read goes to the spreadsheet
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// TTL for datasets without an entry in `dataset_ttl_secs`
  #[serde(default)]
  pub default_ttl_secs: Option<u64>,
  /// Per-dataset TTL overrides, keyed by sheet name
  #[serde(default)]
  pub dataset_ttl_secs: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      default_ttl_secs: None,
      dataset_ttl_secs: BTreeMap::new(),
    }
  }
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
  /// Reference timezone as a fixed offset from UTC
  #[serde(default = "default_utc_offset_hours")]
  pub utc_offset_hours: i32,
}

impl Default for ReportConfig {
  fn default() -> Self {
    Self {
      utc_offset_hours: default_utc_offset_hours(),
    }
  }
}

fn default_utc_offset_hours() -> i32 {
  crate::report::bucket::DEFAULT_UTC_OFFSET_HOURS
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
  #[serde(default = "default_workers")]
  pub workers: usize,
  #[serde(default = "default_queue_capacity")]
  pub queue_capacity: usize,
}

impl Default for TasksConfig {
  fn default() -> Self {
    Self {
      workers: default_workers(),
      queue_capacity: default_queue_capacity(),
    }
  }
}

fn default_workers() -> usize {
  4
}

fn default_queue_capacity() -> usize {
  256
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when `RUST_LOG` is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write a daily rolling log file here in addition to stderr
  #[serde(default)]
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sheetdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sheetdesk/config.yaml
  ///
  /// `APPS_SCRIPT_URL` overrides the configured web app URL.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/sheetdesk/config.yaml\n\
                 See config.example.yaml for the format."
        ))
      }
    };

    if let Ok(url) = std::env::var("APPS_SCRIPT_URL") {
      config.apps_script.url = url;
    }
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("sheetdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sheetdesk").join("config.yaml");
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

  pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the Apps Script shared secret from environment variables.
  ///
  /// Checks SHEETDESK_APPS_SCRIPT_SECRET first, then APPS_SCRIPT_SECRET as fallback.
  pub fn get_apps_script_secret() -> Result<String> {
    std::env::var("SHEETDESK_APPS_SCRIPT_SECRET")
      .or_else(|_| std::env::var("APPS_SCRIPT_SECRET"))
      .map_err(|_| {
        eyre!("Apps Script secret not found. Set SHEETDESK_APPS_SCRIPT_SECRET or APPS_SCRIPT_SECRET environment variable.")
      })
  }

  /// Dataset TTLs: built-in defaults, then the configured default, then
  /// per-dataset overrides.
  pub fn ttl_policy(&self) -> TtlPolicy {
    let mut policy = TtlPolicy::default();
    if let Some(secs) = self.cache.default_ttl_secs {
      policy = policy.with_default(Duration::from_secs(secs));
    }
    self
      .cache
      .dataset_ttl_secs
      .iter()
      .fold(policy, |policy, (dataset, secs)| {
        policy.with_ttl(dataset.clone(), Duration::from_secs(*secs))
      })
  }

  pub fn utc_offset(&self) -> Result<FixedOffset, Error> {
    let hours = self.report.utc_offset_hours;
    if !(-12..=14).contains(&hours) {
      return Err(Error::Config(format!("utc_offset_hours out of range: {}", hours)));
    }
    FixedOffset::east_opt(hours * 3600)
      .ok_or_else(|| Error::Config(format!("invalid utc_offset_hours: {}", hours)))
  }
}
