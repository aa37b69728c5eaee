// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client configuration.
//!
//! Supports both programmatic and file-based configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Metadata discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// HTTP client settings shared by discovery and calls.
    #[serde(default)]
    pub http: HttpConfig,

    /// Log level used by front ends that do not get one on the command line.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Metadata discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum depth of nested `import`/`include` references.
    #[serde(default = "default_max_import_depth")]
    pub max_import_depth: usize,

    /// Retry with `?wsdl` appended when the address does not serve metadata.
    #[serde(default = "default_true")]
    pub try_wsdl_query: bool,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Redirects followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_import_depth() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("dynsoap/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_redirects() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            http: HttpConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_import_depth: default_max_import_depth(),
            try_wsdl_query: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.max_import_depth == 0 {
            return Err(ConfigError::Invalid(
                "discovery.max_import_depth must be at least 1".into(),
            ));
        }
        if self.http.max_redirects == 0 {
            return Err(ConfigError::Invalid(
                "http.max_redirects must be at least 1".into(),
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("http.user_agent is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.discovery.max_import_depth, 8);
        assert!(config.discovery.try_wsdl_query);
        assert_eq!(config.http.max_redirects, 5);
        assert!(config.http.user_agent.starts_with("dynsoap/"));
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
log_level = "debug"

[discovery]
try_wsdl_query = false
"#,
        )
        .expect("parse");
        assert_eq!(config.log_level, "debug");
        assert!(!config.discovery.try_wsdl_query);
        assert_eq!(config.discovery.max_import_depth, 8);
        assert_eq!(config.http, HttpConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_toml("[http]\nmax_redirects = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::from_toml("[discovery]\nmax_import_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::from_toml("[http\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[http]\nuser_agent = \"custom-agent\"").expect("write");

        let config = Config::from_file(file.path()).expect("load");
        assert_eq!(config.http.user_agent, "custom-agent");

        let missing = Config::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
