use crate::error::{DubError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production SpeechLab API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://translate-api.speechlab.ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMatchingMode {
    #[default]
    Source,
    Native,
}

impl std::fmt::Display for VoiceMatchingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceMatchingMode::Source => write!(f, "source"),
            VoiceMatchingMode::Native => write!(f, "native"),
        }
    }
}

impl std::str::FromStr for VoiceMatchingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" => Ok(VoiceMatchingMode::Source),
            "native" => Ok(VoiceMatchingMode::Native),
            _ => Err(format!(
                "Unknown voice matching mode: {}. Use 'source' or 'native'",
                s
            )),
        }
    }
}

/// Account credentials for the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub email: String,
    pub password: String,
    pub source_language: String,
    pub unit_type: String,
    pub voice_matching_mode: VoiceMatchingMode,
    pub max_wait_time_minutes: u64,
    pub check_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub base_url: String,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            source_language: "en".to_string(),
            unit_type: "whiteGlove".to_string(),
            voice_matching_mode: VoiceMatchingMode::default(),
            max_wait_time_minutes: 60,
            check_interval_seconds: 30,
            request_timeout_seconds: 30,
            base_url: DEFAULT_BASE_URL.to_string(),
            debug: false,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let mut settings = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Read settings from a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            DubError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Override fields from `SPEECHLAB_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(email) = get("SPEECHLAB_EMAIL") {
            self.email = email;
        }
        if let Some(password) = get("SPEECHLAB_PASSWORD") {
            self.password = password;
        }
        if let Some(lang) = get("SPEECHLAB_SOURCE_LANGUAGE") {
            self.source_language = lang;
        }
        if let Some(unit_type) = get("SPEECHLAB_UNIT_TYPE") {
            self.unit_type = unit_type;
        }
        if let Some(mode) = get("SPEECHLAB_VOICE_MATCHING_MODE") {
            if let Ok(m) = mode.parse() {
                self.voice_matching_mode = m;
            }
        }
        if let Some(minutes) = get("SPEECHLAB_MAX_WAIT_TIME_MINUTES") {
            if let Ok(m) = minutes.parse() {
                self.max_wait_time_minutes = m;
            }
        }
        if let Some(seconds) = get("SPEECHLAB_CHECK_INTERVAL_SECONDS") {
            if let Ok(s) = seconds.parse() {
                self.check_interval_seconds = s;
            }
        }
        if let Some(url) = get("SPEECHLAB_BASE_URL") {
            self.base_url = url;
        }
        if let Some(debug) = get("SPEECHLAB_DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval_seconds == 0 {
            return Err(DubError::Config(
                "Check interval must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(DubError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.base_url.trim().is_empty() {
            return Err(DubError::Config("Base URL must not be empty".to_string()));
        }

        Ok(())
    }

    /// Credentials from the settings, failing when either half is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(DubError::Validation(
                "Missing required credentials. Please set SPEECHLAB_EMAIL and SPEECHLAB_PASSWORD"
                    .to_string(),
            ));
        }
        Ok(Credentials::new(self.email.trim(), self.password.clone()))
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_time_minutes.saturating_mul(60))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("speechdub").join("config.toml"))
    }
}
