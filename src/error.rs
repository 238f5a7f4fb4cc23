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


//! Error types for kindle-pids
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by where they come from (key store, platform
//! collaborators, caller input) so the PID orchestrator can decide which
//! failures only abandon one derivation branch.
//!
//! ## Error taxonomy
//!
//! - `RecordNotFound` - a named record is missing from a key store
//! - `KeyStoreParse` - the key-store contents could not be split into records
//! - `KeyStoreIo` - the key-store file could not be read
//! - `UnwrapFailed` - the OS-level protection could not be removed from a blob
//! - `IdentityUnavailable` - user name or volume serial could not be obtained
//!
//! Malformed alphabet-encoded input is never an error: `decode` stops at the
//! first pair it cannot map and returns what it has so far.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our PidError type
pub type Result<T> = std::result::Result<T, PidError>;

/// Main error type for kindle-pids
#[derive(Error, Debug)]
pub enum PidError {
    // ===== Key Store Errors =====

    /// Record with the given (plaintext or hashed) name is not in the store
    #[error("Record not found in key store: {0}")]
    RecordNotFound(String),

    /// Key-store contents are malformed
    #[error("Failed to parse key store: {0}")]
    KeyStoreParse(String),

    /// Key-store file could not be read
    #[error("Failed to read key store {}: {source}", .path.display())]
    KeyStoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Platform Collaborator Errors =====

    /// OS-level protection could not be removed from a stored blob
    #[error("Failed to remove protection: {0}")]
    UnwrapFailed(String),

    /// Machine identity string (user name, volume serial) is unavailable
    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),

    // ===== Input/Configuration Errors =====

    /// Caller supplied input the derivation cannot work with
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file is invalid or incomplete
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ===== External Library Errors =====

    /// JSON deserialization error (configuration file)
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

// Helper methods for creating common errors
impl PidError {
    /// Create a RecordNotFound error with a record name
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        PidError::RecordNotFound(name.into())
    }

    /// Create a KeyStoreParse error with a message
    pub fn parse<S: Into<String>>(message: S) -> Self {
        PidError::KeyStoreParse(message.into())
    }

    /// Create an UnwrapFailed error with a message
    pub fn unwrap_failed<S: Into<String>>(message: S) -> Self {
        PidError::UnwrapFailed(message.into())
    }

    /// Create an IdentityUnavailable error with a message
    pub fn identity<S: Into<String>>(message: S) -> Self {
        PidError::IdentityUnavailable(message.into())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        PidError::InvalidInput(message.into())
    }

    /// Create a KeyStoreIo error for a path
    pub fn key_store_io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        PidError::KeyStoreIo {
            path: path.into(),
            source,
        }
    }

    /// Check if error only abandons one derivation branch
    ///
    /// Returns `true` for failures of a single store, record or collaborator
    /// call. The orchestrator logs these and moves on to the next input.
    pub fn is_branch_local(&self) -> bool {
        matches!(
            self,
            PidError::RecordNotFound(_)
                | PidError::KeyStoreParse(_)
                | PidError::KeyStoreIo { .. }
                | PidError::UnwrapFailed(_)
                | PidError::IdentityUnavailable(_)
        )
    }

    /// Check if error is related to reading or parsing a key store
    pub fn is_key_store_error(&self) -> bool {
        matches!(
            self,
            PidError::RecordNotFound(_) | PidError::KeyStoreParse(_) | PidError::KeyStoreIo { .. }
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            PidError::KeyStoreIo { path, .. } => {
                format!(
                    "Could not read the Kindle info file at '{}'. Check the path and permissions.",
                    path.display()
                )
            }
            PidError::UnwrapFailed(_) => {
                "The Kindle info file is protected for another user or machine and cannot be read here.".to_string()
            }
            PidError::IdentityUnavailable(what) => {
                format!("Missing machine identity: {}. Set it in the configuration file.", what)
            }
            _ => self.to_string(),
        }
    }
}
