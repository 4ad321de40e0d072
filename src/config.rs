use crate::{Alignment, LogoTone, MarkflowConfig, Theme};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Keys accepted by [`MarkflowConfig::set`].
pub const SETTABLE_KEYS: &[&str] = &[
    "use_logo",
    "logo_size",
    "alignment",
    "bottom_margin",
    "auto_invert",
    "alternate_logo",
    "logo_tone",
    "brightness_threshold",
    "output_directory",
    "theme",
    "jpeg_quality",
];

impl MarkflowConfig {
    /// Load the configuration, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            debug!("Config file {:?} is empty, using defaults", path);
            return Ok(Self::default());
        }

        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Write the configuration as 4-space indented JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;

        std::fs::write(path, buffer)?;
        debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.logo_size > 0.0 && self.logo_size <= 100.0) {
            return Err(invalid("logo_size", "must be in (0, 100]"));
        }
        if !(0.0..100.0).contains(&self.bottom_margin) {
            return Err(invalid("bottom_margin", "must be in [0, 100)"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("jpeg_quality", "must be in [1, 100]"));
        }
        Ok(())
    }

    /// Set a single key from its string form, as typed on the command line.
    /// The configuration is left untouched when the new value is rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        updated.apply_setting(key, value.trim())?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "use_logo" | "Use_logo" => self.use_logo = optional_string(value),
            "alternate_logo" => self.alternate_logo = optional_string(value),
            "logo_size" => self.logo_size = parse_number(key, value)?,
            "bottom_margin" => self.bottom_margin = parse_number(key, value)?,
            "brightness_threshold" => self.brightness_threshold = parse_number(key, value)?,
            "jpeg_quality" => self.jpeg_quality = parse_number(key, value)?,
            "auto_invert" => {
                self.auto_invert = match value.to_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => return Err(invalid(key, "expected true or false")),
                }
            }
            "alignment" => {
                self.alignment = value
                    .parse::<Alignment>()
                    .map_err(|e| invalid(key, e))?
            }
            "logo_tone" => {
                self.logo_tone = value.parse::<LogoTone>().map_err(|e| invalid(key, e))?
            }
            "theme" => {
                self.theme = match value.to_lowercase().as_str() {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    "auto" => Theme::Auto,
                    _ => return Err(invalid(key, "expected light, dark or auto")),
                }
            }
            "output_directory" => {
                if value.is_empty() {
                    return Err(invalid(key, "must not be empty"));
                }
                self.output_directory = PathBuf::from(value);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| invalid(key, e.to_string()))
}
