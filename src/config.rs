//! Field settings
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (familiar-models.toml)
//! - Environment variables (FAMILIAR_MODELS__*)
//!
//! ## Example config file (familiar-models.toml):
//! ```toml
//! [fields]
//! default_timezone = "+08:00"
//! default_format = "datetime"
//! ```
//!
//! Temporal fields read the installed settings when they are created, so
//! [`install`] has to run before models are built.

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::sync::{OnceLock, RwLock};

use crate::fields::{Format, Timezone};

/// Main configuration for the model layer
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelConfig {
    /// Field defaults
    #[serde(default)]
    pub fields: FieldSettings,
}

/// Defaults applied to newly created fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSettings {
    /// Timezone temporal fields project into when none is configured
    #[serde(default)]
    pub default_timezone: Option<String>,

    /// Representation format for datetime and timestamp fields
    #[serde(default = "default_format")]
    pub default_format: String,
}

fn default_format() -> String {
    "datetime".to_string()
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            default_timezone: None,
            default_format: default_format(),
        }
    }
}

impl ModelConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "familiar-models.toml",
            ".familiar-models.toml",
            "config/familiar-models.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "models") {
            let xdg_config = config_dir.config_dir().join("familiar-models.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("FAMILIAR_MODELS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from the default locations (plus `config_path`) and install the
    /// field settings
    pub fn init(config_path: Option<&str>) -> crate::error::Result<Self> {
        let config = Self::load_from(config_path)?;
        config.install()?;
        Ok(config)
    }

    /// Check the field settings and make them the process-wide defaults
    pub fn install(&self) -> crate::error::Result<()> {
        Format::parse(&self.fields.default_format)?;
        if let Some(timezone) = &self.fields.default_timezone {
            Timezone::parse(timezone)?;
        }
        self::install(self.fields.clone());
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

fn current() -> &'static RwLock<FieldSettings> {
    static SETTINGS: OnceLock<RwLock<FieldSettings>> = OnceLock::new();
    SETTINGS.get_or_init(|| RwLock::new(FieldSettings::default()))
}

/// Snapshot of the process-wide field settings
pub fn settings() -> FieldSettings {
    match current().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the process-wide field settings
pub fn install(settings: FieldSettings) {
    tracing::debug!(?settings, "installing field settings");
    match current().write() {
        Ok(mut guard) => *guard = settings,
        Err(poisoned) => *poisoned.into_inner() = settings,
    }
}
