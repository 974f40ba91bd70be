//! Vault service configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use sealbox_common::{Error, Result};
use sealbox_crypto::OpenOptions;
use sealbox_storage::StoreConfig;

/// Largest accepted file, matching the upload cap of the hosting service.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Deadline for a single seal or open.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;

/// Vault service configuration.
///
/// Missing fields in JSON fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Maximum plaintext (or sealed payload) size in bytes.
    pub max_file_size: u64,
    /// Deadline in milliseconds for each seal/open.
    pub operation_timeout_ms: u64,
    /// Reject envelopes whose clear IV differs from the wrapped IV.
    pub strict_iv: bool,
    /// Blob store backing the vault.
    pub store: StoreConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            strict_iv: false,
            store: StoreConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Deadline for each seal/open.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Options passed to the envelope when opening.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            strict_iv: self.strict_iv,
        }
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    /// - `InvalidInput` if the size limit or timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(Error::InvalidInput(
                "max_file_size must be positive".to_string(),
            ));
        }
        if self.operation_timeout_ms == 0 {
            return Err(Error::InvalidInput(
                "operation_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
