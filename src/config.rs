// kindle-pids - Kindle PID derivation
// Copyright (C) 2025 kindle-pids contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Configuration
//!
//! Machine identity and the default store location come from a small JSON
//! file, so PIDs can be derived for a Kindle info file copied from another
//! machine as well as on the machine itself.
//!
//! ```json
//! {
//!   "flavor": "windows",
//!   "volume_serial": "9A3F27B1",
//!   "user_name": "reader",
//!   "default_key_store": "C:/Users/reader/AppData/Local/Amazon/Kindle/kindle.info",
//!   "protection": "passthrough"
//! }
//! ```

use crate::error::{PidError, Result};
use crate::keystore::platform::{KeyStorePlatform, StoreFlavor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How stored blobs lose their OS-level protection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionMode {
    /// No unwrap provider on this host; every unwrap fails
    #[default]
    Unsupported,
    /// Blobs were exported already unwrapped
    Passthrough,
}

/// Contents of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    /// Store layout; the build target's when absent
    pub flavor: Option<StoreFlavor>,
    /// Serial number of the system volume the store was created on
    pub volume_serial: Option<String>,
    /// Account name the store was created under
    pub user_name: Option<String>,
    /// Store processed when device defaults are requested
    pub default_key_store: Option<PathBuf>,
    pub protection: ProtectionMode,
}

impl PidConfig {
    /// Parse a configuration from JSON text
    ///
    /// # Errors
    /// - SerdeJsonError if the text is not a valid configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    ///
    /// # Errors
    /// - ConfigurationError if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PidError::ConfigurationError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text).map_err(|e| {
            PidError::ConfigurationError(format!("invalid {}: {}", path.display(), e))
        })
    }

    /// Store layout to use
    pub fn flavor(&self) -> StoreFlavor {
        self.flavor.unwrap_or_else(StoreFlavor::host)
    }
}

/// Platform whose identity and unwrap behaviour come from a [`PidConfig`]
#[derive(Debug, Clone)]
pub struct ConfiguredPlatform {
    config: PidConfig,
}

impl ConfiguredPlatform {
    pub fn new(config: PidConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }
}

impl KeyStorePlatform for ConfiguredPlatform {
    fn flavor(&self) -> StoreFlavor {
        self.config.flavor()
    }

    fn default_key_store_path(&self) -> Option<PathBuf> {
        self.config.default_key_store.clone()
    }

    fn remove_protection(&self, blob: &[u8], _context: &[u8]) -> Result<Vec<u8>> {
        match self.config.protection {
            ProtectionMode::Passthrough => Ok(blob.to_vec()),
            ProtectionMode::Unsupported => Err(PidError::unwrap_failed(
                "no protection provider configured for this host",
            )),
        }
    }

    fn user_name(&self) -> Result<String> {
        if let Some(name) = &self.config.user_name {
            return Ok(name.clone());
        }
        std::env::var("USERNAME")
            .or_else(|_| std::env::var("USER"))
            .map_err(|_| PidError::identity("user name"))
    }

    fn volume_serial_number(&self) -> Result<String> {
        self.config
            .volume_serial
            .clone()
            .ok_or_else(|| PidError::identity("volume serial number"))
    }
}
