//! TOML-based configuration system for classkit.

use crate::error::{ClasskitError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level classkit configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClasskitConfig {
    #[serde(default)]
    pub classroom: ClassroomConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

/// Google Classroom API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Page size requested from list endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ClassroomConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://classroom.googleapis.com".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

/// OAuth credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Authorized-user JSON file holding access and refresh tokens.
    #[serde(default = "default_token_file")]
    pub token_file: String,
    /// Static bearer token. Takes precedence over `token_file` when set.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh the access token when it expires within this many seconds.
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            access_token: None,
            refresh_margin_secs: default_refresh_margin(),
        }
    }
}

fn default_token_file() -> String {
    "token.json".into()
}

fn default_refresh_margin() -> i64 {
    60
}

/// Upper bound for `auth.refresh_margin_secs` (one day).
pub const MAX_REFRESH_MARGIN_SECS: i64 = 86_400;

/// Roster import defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RosterConfig {
    #[serde(default)]
    pub mode: EnrollModeConfig,
}

/// How students from a roster file are brought into a course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrollModeConfig {
    /// Send an invitation the student accepts.
    #[default]
    Invite,
    /// Enrol directly. Requires domain administrator rights.
    Add,
}

impl ClasskitConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ClasskitError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::generate_default())
        }
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        if self.classroom.base_url.is_empty() {
            return Err(ClasskitError::Config(
                "classroom.base_url must not be empty".into(),
            ));
        }

        if !(self.classroom.base_url.starts_with("http://")
            || self.classroom.base_url.starts_with("https://"))
        {
            return Err(ClasskitError::Config(format!(
                "classroom.base_url must be an http(s) URL: {}",
                self.classroom.base_url
            )));
        }

        if self.classroom.timeout_secs == 0 {
            return Err(ClasskitError::Config(
                "classroom.timeout_secs must be greater than zero".into(),
            ));
        }

        if self.classroom.page_size == 0 || self.classroom.page_size > 1000 {
            return Err(ClasskitError::Config(
                "classroom.page_size must be between 1 and 1000".into(),
            ));
        }

        if self.auth.access_token.is_none() && self.auth.token_file.is_empty() {
            return Err(ClasskitError::Config(
                "auth.token_file is required when auth.access_token is not set".into(),
            ));
        }

        if matches!(self.auth.access_token.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(ClasskitError::Config(
                "auth.access_token must not be empty".into(),
            ));
        }

        if !(0..=MAX_REFRESH_MARGIN_SECS).contains(&self.auth.refresh_margin_secs) {
            return Err(ClasskitError::Config(format!(
                "auth.refresh_margin_secs must be between 0 and {MAX_REFRESH_MARGIN_SECS}"
            )));
        }

        Ok(())
    }

    /// Generate a sensible default configuration.
    pub fn generate_default() -> Self {
        Self {
            classroom: ClassroomConfig::default(),
            auth: AuthConfig::default(),
            roster: RosterConfig::default(),
        }
    }

    /// Serialize to TOML for writing a config file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClasskitError::Serialization(format!("failed to write config: {e}")))
    }
}
