//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `MissionConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("mission.toml")).unwrap();
//! println!("Perception topic: {}", config.topics.perception);
//! ```

mod parser;
mod validator;

pub use contracts::MissionConfig;
pub use parser::ConfigFormat;

use contracts::ReplayError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<MissionConfig, ReplayError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<MissionConfig, ReplayError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize MissionConfig to TOML string
    pub fn to_toml(config: &MissionConfig) -> Result<String, ReplayError> {
        toml::to_string_pretty(config)
            .map_err(|e| ReplayError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize MissionConfig to JSON string
    pub fn to_json(config: &MissionConfig) -> Result<String, ReplayError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ReplayError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ReplayError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ReplayError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| ReplayError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ReplayError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<MissionConfig, ReplayError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
