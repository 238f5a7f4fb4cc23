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


//! Platform collaborators of the key-store reader
//!
//! Kindle for PC and Kindle for Mac keep the same kind of record set but
//! differ in delimiter, record alphabet and in how a stored blob is unwrapped.
//! Those differences are captured by [`StoreFlavor`]; the OS-specific calls
//! (reading the file, removing protection, machine identity) sit behind
//! [`KeyStorePlatform`] so the orchestrator never branches on the host OS.

use crate::crypto::alphabet::{Alphabet, MAC_RECORD_ALPHABET, WINDOWS_RECORD_ALPHABET};
use crate::error::{PidError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Entropy the Kindle app protects its info file records with
pub const UNWRAP_CONTEXT: &[u8] = b"";

/// Layout of a Kindle info file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFlavor {
    /// Kindle for PC: `{`-delimited, values used as unwrapped
    Windows,
    /// Kindle for Mac: `[`-delimited, values decoded again after unwrapping
    Mac,
}

impl StoreFlavor {
    /// Flavor written by the Kindle app of the build target
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            StoreFlavor::Windows
        } else {
            StoreFlavor::Mac
        }
    }

    /// Character separating records
    pub fn record_delimiter(self) -> char {
        match self {
            StoreFlavor::Windows => '{',
            StoreFlavor::Mac => '[',
        }
    }

    /// Alphabet of record names and stored values
    pub fn record_alphabet(self) -> Alphabet {
        match self {
            StoreFlavor::Windows => WINDOWS_RECORD_ALPHABET,
            StoreFlavor::Mac => MAC_RECORD_ALPHABET,
        }
    }

    /// Whether unwrapped cleartext is itself identity-alphabet encoded
    pub fn decodes_after_unwrap(self) -> bool {
        matches!(self, StoreFlavor::Mac)
    }
}

/// OS capabilities the key-store reader and orchestrator depend on
///
/// One implementation per host platform, injected into the orchestrator.
pub trait KeyStorePlatform {
    /// Layout of the stores this platform reads
    fn flavor(&self) -> StoreFlavor;

    /// Location of the Kindle app's own store, if known
    fn default_key_store_path(&self) -> Option<PathBuf>;

    /// Read the raw bytes of a store
    ///
    /// # Errors
    /// - KeyStoreIo if the file cannot be read
    fn open_key_store(&self, path: &Path) -> Result<Vec<u8>> {
        read_key_store_file(path)
    }

    /// Remove the OS-level protection from a stored blob
    ///
    /// `context` is the extra entropy the blob was protected with; the key
    /// store reader passes [`UNWRAP_CONTEXT`].
    ///
    /// # Errors
    /// - UnwrapFailed on corrupt or foreign data
    fn remove_protection(&self, blob: &[u8], context: &[u8]) -> Result<Vec<u8>>;

    /// Name of the current user account
    fn user_name(&self) -> Result<String>;

    /// Serial number of the system volume
    fn volume_serial_number(&self) -> Result<String>;
}

/// Read a store file from disk
pub fn read_key_store_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| PidError::key_store_io(path, e))
}
