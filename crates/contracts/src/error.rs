//! Layered error definitions
//!
//! Categorized by source: config / archive / container / schema

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ReplayError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Archive Errors =====
    /// Bag archive path does not exist
    #[error("bag archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    /// Bag archive is neither an .mcap file nor a readable .tgz archive
    #[error("unsupported bag archive format '{}': {message}", path.display())]
    ArchiveFormatUnsupported { path: PathBuf, message: String },

    /// Extracted archive does not contain the expected log file
    #[error("extracted archive is missing {}", expected.display())]
    ContainedLogMissing { expected: PathBuf },

    // ===== Container Errors =====
    /// MCAP container read failure
    #[error("bag read error: {message}")]
    BagRead { message: String },

    // ===== Schema Errors =====
    /// Message decode failed against the channel schema
    #[error("schema decode failure on '{topic}': {message}")]
    SchemaDecodeFailure { topic: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create archive format error
    pub fn archive_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArchiveFormatUnsupported {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create container read error
    pub fn bag_read(message: impl Into<String>) -> Self {
        Self::BagRead {
            message: message.into(),
        }
    }

    /// Create schema decode error
    pub fn schema_decode(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaDecodeFailure {
            topic: topic.into(),
            message: message.into(),
        }
    }
}
