//! # Configuration Management
//!
//! This module handles loading and managing server configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (set by most deployment platforms)
//! 2. Environment variables (APP_SERVER__PORT, APP_STORAGE__TARGET, APP_ANONYMIZER__SALT, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Nested keys are separated by a double underscore so that field names containing a
//! single underscore (`timeout_secs`) survive: `APP_FETCH__TIMEOUT_SECS=30`.
//!
//! ## Secrets:
//! `anonymizer.salt` is a secret. It is never printed; the `Debug` impl of
//! [`AnonymizerConfig`] redacts it.

use std::env;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::anonymize::MIN_SALT_LEN;
use crate::storage::StorageSpec;

/// Main server configuration.
///
/// ## Sections:
/// - `server`: where to listen
/// - `storage`: where finished recordings go
/// - `anonymizer`: the salt for recording names
/// - `fetch`: limits for downloading segments from the telephony provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub anonymizer: AnonymizerConfig,
    pub fetch: FetchConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Storage destination.
///
/// ## Format:
/// - `file:<path>`: a local directory, created if missing
/// - `s3:<bucket>`: an S3 bucket, credentials from the standard AWS environment
///
/// There is no default; the server refuses to start without a destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub target: String,
}

/// Anonymization settings.
///
/// When `salt` is unset a random one is generated at startup. Names derived from a
/// generated salt cannot be linked to names from a previous run.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AnonymizerConfig {
    pub salt: Option<String>,
}

impl fmt::Debug for AnonymizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnonymizerConfig")
            .field("salt", &self.salt.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Limits applied to each segment download.
///
/// ## Fields:
/// - `timeout_secs`: whole-request budget for one segment (connect + headers + body)
/// - `connect_timeout_secs`: budget for establishing the connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            storage: StorageConfig {
                target: String::new(),
            },
            anonymizer: AnonymizerConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Storage target parses as `file:<path>` or `s3:<bucket>`
    /// - A supplied salt is at least 32 characters
    /// - Fetch timeouts are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        self.storage_spec()?;

        if let Some(salt) = &self.anonymizer.salt {
            if salt.chars().count() < MIN_SALT_LEN {
                return Err(anyhow::anyhow!(
                    "Salt must be at least {} characters long",
                    MIN_SALT_LEN
                ));
            }
        }

        if self.fetch.timeout_secs == 0 || self.fetch.connect_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Fetch timeouts must be greater than 0"));
        }

        Ok(())
    }

    /// The parsed storage destination.
    pub fn storage_spec(&self) -> Result<StorageSpec> {
        Ok(self.storage.target.parse::<StorageSpec>()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
