//! TOML-based settings and per-run audit configuration.
//!
//! Settings are stored at `~/.config/teamtally/config.toml` and hold the
//! defaults the command line can override:
//! - Date format for `--oldest` / `--latest`
//! - Histogram bucket width
//! - Page ceiling requested from the service
//! - Standup container marker and shared-container filtering
//! - API base URLs
//!
//! A missing file, or a file with only some keys, is valid.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classify::{Classifier, DEFAULT_STANDUP_MARKER};
use crate::error::ConfigError;
use crate::range::RangeBuilder;

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Persistent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Histogram bucket width in hours.
    #[serde(default = "default_increment_hours")]
    pub increment_hours: u32,
    /// Maximum events the service returns for one request.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    #[serde(default = "default_standup_marker")]
    pub standup_marker: String,
    #[serde(default = "default_true")]
    pub skip_global_shared: bool,
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,
    #[serde(default = "default_trello_api_url")]
    pub trello_api_url: String,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.into()
}
fn default_increment_hours() -> u32 {
    24
}
fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}
fn default_standup_marker() -> String {
    DEFAULT_STANDUP_MARKER.into()
}
fn default_true() -> bool {
    true
}
fn default_slack_api_url() -> String {
    "https://slack.com/api/".into()
}
fn default_trello_api_url() -> String {
    "https://api.trello.com/1/".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            increment_hours: default_increment_hours(),
            page_limit: default_page_limit(),
            standup_marker: default_standup_marker(),
            skip_global_shared: true,
            slack_api_url: default_slack_api_url(),
            trello_api_url: default_trello_api_url(),
        }
    }
}

/// Returns `~/.config/teamtally[-dev]/` based on TEAMTALLY_ENV.
///
/// Set TEAMTALLY_ENV=dev to use the development directory. The directory is
/// not created here.
pub fn config_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TEAMTALLY_ENV").unwrap_or_else(|_| "production".to_string());

    if env == "dev" {
        base_dir.join("teamtally-dev")
    } else {
        base_dir.join("teamtally")
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load from the default location, or defaults when there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let settings: Settings = toml::from_str(&content)?;
                settings.validate()?;
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Write default settings to `path` unless a file already exists.
    /// Returns whether a file was written.
    pub fn init_at(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.increment_hours == 0 {
            return Err(invalid("increment_hours", "must be greater than zero"));
        }
        if self.page_limit == 0 {
            return Err(invalid("page_limit", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Parse a command-line date with a strftime-style `format`.
///
/// The value is read as local time. Formats without a time of day resolve
/// to local midnight.
pub fn parse_date(field: &str, value: &str, format: &str) -> Result<DateTime<Utc>, ConfigError> {
    let invalid_date = || ConfigError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
        format: format.to_string(),
    };

    let naive = NaiveDateTime::parse_from_str(value, format)
        .or_else(|_| NaiveDate::parse_from_str(value, format).map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|_| invalid_date())?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid_date)
}

/// Reject an empty credential or required target name.
pub fn require<'a>(name: &str, value: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingCredential(name.to_string()));
    }
    Ok(trimmed)
}

/// Command-line values that take precedence over [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct AuditOverrides {
    pub oldest: Option<String>,
    pub latest: Option<String>,
    pub date_format: Option<String>,
    pub increment_hours: Option<u32>,
    pub page_limit: Option<usize>,
}

/// Validated configuration for one audit run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub oldest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub page_limit: usize,
    pub range: RangeBuilder,
    pub classifier: Classifier,
}

impl AuditConfig {
    pub fn build(settings: &Settings, overrides: &AuditOverrides) -> Result<Self, ConfigError> {
        let format = overrides
            .date_format
            .as_deref()
            .unwrap_or(&settings.date_format);

        let oldest = overrides
            .oldest
            .as_deref()
            .map(|v| parse_date("oldest", v, format))
            .transpose()?;
        let latest = overrides
            .latest
            .as_deref()
            .map(|v| parse_date("latest", v, format))
            .transpose()?;

        let page_limit = overrides.page_limit.unwrap_or(settings.page_limit);
        if page_limit == 0 {
            return Err(invalid("page_limit", "must be greater than zero"));
        }
        let increment_hours = overrides.increment_hours.unwrap_or(settings.increment_hours);

        Ok(Self {
            oldest,
            latest,
            page_limit,
            range: RangeBuilder::from_hours(increment_hours)?,
            classifier: Classifier::new(
                settings.standup_marker.clone(),
                settings.skip_global_shared,
            ),
        })
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            oldest: None,
            latest: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            range: RangeBuilder::default(),
            classifier: Classifier::default(),
        }
    }
}
