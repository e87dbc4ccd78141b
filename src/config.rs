//! # Configuration Management
//!
//! Centralized configuration for the messaging layer.
//!
//! This module provides structured configuration for servers and clients:
//! listen/target addresses, the protocol version folded into the
//! handshake, and transport limits.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Environment-variable overrides via `from_env()`
//! - Direct instantiation with defaults

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

/// Protocol version folded into the handshake by default. Both peers must
/// agree or validation fails.
pub const PROTOCOL_VERSION: f32 = 1.0;

/// Max allowed message body size (16 MB). Claims beyond this are rejected
/// before allocation.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Main configuration structure containing all configurable settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,
}

impl NetConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| WireError::ConfigError(format!("failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| WireError::ConfigError(format!("failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| WireError::ConfigError(format!("failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables, starting from the
    /// defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GAMEWIRE_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(addr) = std::env::var("GAMEWIRE_CLIENT_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(version) = std::env::var("GAMEWIRE_PROTOCOL_VERSION") {
            if let Ok(value) = version.parse::<f32>() {
                config.server.version = value;
                config.client.version = value;
            }
        }

        if let Ok(size) = std::env::var("GAMEWIRE_MAX_PAYLOAD_SIZE") {
            if let Ok(value) = size.parse::<usize>() {
                config.transport.max_payload_size = value;
            }
        }

        Ok(config)
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns a list of validation errors; an empty list means the
    /// configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors.extend(self.transport.validate());
        errors
    }

    /// Validate and return a `Result` - convenience method.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WireError::ConfigError(format!(
                "configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:60000")
    pub address: String,

    /// Protocol version folded into the handshake
    pub version: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:60000"),
            version: PROTOCOL_VERSION,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "invalid server address format: '{}' (expected format: '0.0.0.0:60000')",
                self.address
            ));
        }

        errors.extend(validate_version("server", self.version));
        errors
    }
}

/// Client-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Default target server address
    pub address: String,

    /// Protocol version folded into the handshake
    pub version: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:60000"),
            version: PROTOCOL_VERSION,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("client address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "invalid client address format: '{}' (expected format: '127.0.0.1:60000')",
                self.address
            ));
        }

        errors.extend(validate_version("client", self.version));
        errors
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Maximum allowed message body size in bytes
    pub max_payload_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_payload_size == 0 {
            errors.push("max payload size cannot be 0".to_string());
        } else if self.max_payload_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "max payload size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_payload_size
            ));
        }

        errors
    }
}

fn validate_version(section: &str, version: f32) -> Vec<String> {
    let mut errors = Vec::new();
    if !version.is_finite() {
        errors.push(format!("{section} protocol version must be finite"));
    } else if version <= 0.0 {
        errors.push(format!(
            "{section} protocol version must be positive (got {version})"
        ));
    }
    errors
}
