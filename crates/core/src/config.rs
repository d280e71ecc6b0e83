//! Monitor configuration: optional TOML file, then environment overrides.
//!
//! ```toml
//! log_file = "/var/log/app.log"
//! poll_interval_secs = 5
//! use_llm = true
//!
//! [llm]
//! provider = "OpenAI"
//! model = "gpt-4o-mini"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{LlmConfig, ProviderType};
use crate::reconcile::ReconcilerOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// The watched log file.
    pub log_file: PathBuf,
    /// JSON audit trail of extracted records.
    pub output_file: PathBuf,
    pub poll_interval_secs: u64,
    /// SQLite issue database. Defaults to the app cache dir.
    pub database_path: Option<PathBuf>,
    /// Use the model-backed ticket generator instead of the heuristic.
    pub use_llm: bool,
    pub llm: LlmConfig,
    pub preserve_original_title: bool,
    pub application_type: Option<String>,
    /// Tail cursor checkpoint. Unset means every start re-reads from byte 0.
    pub cursor_file: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("app.log"),
            output_file: PathBuf::from("errors.json"),
            poll_interval_secs: 5,
            database_path: None,
            use_llm: false,
            llm: LlmConfig::default(),
            preserve_original_title: true,
            application_type: Some("Test".into()),
            cursor_file: None,
        }
    }
}

impl MonitorConfig {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(&|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment-style overrides. `lookup` returns a variable's value.
    pub fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("LOG_FILE_PATH") {
            self.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("OUTPUT_FILE") {
            self.output_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_var("POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("USE_LLM") {
            self.use_llm = parse_bool("USE_LLM", &v)?;
        }
        if let Some(v) = lookup("LLM_CLASS") {
            self.llm.provider =
                ProviderType::parse(&v).ok_or(ConfigError::UnsupportedLlmClass(v))?;
        }
        if let Some(v) = lookup("PRESERVE_ORIGINAL_TITLE") {
            self.preserve_original_title = parse_bool("PRESERVE_ORIGINAL_TITLE", &v)?;
        }
        if let Some(v) = lookup("APPLICATION_TYPE") {
            self.application_type = Some(v);
        }
        if let Some(v) = lookup("CURSOR_FILE") {
            self.cursor_file = Some(PathBuf::from(v));
        }
        self.llm.apply_overrides(lookup)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_secs".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Configured database path, else the default under the cache dir.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(crate::paths::db_path)
    }

    pub fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            preserve_original_title: self.preserve_original_title,
            application_type: self.application_type.clone(),
        }
    }
}

pub(crate) fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
