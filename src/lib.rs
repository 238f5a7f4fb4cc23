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


//! Kindle PID derivation
//!
//! Derives the candidate PIDs (book decryption keys) of a Kindle book from
//! Kindle for PC/Mac info files, e-ink Kindle serial numbers and the book's
//! header token pair.
//!
//! # Modules
//! - `crypto` - codec, checksum and PID generator primitives
//! - `keystore` - Kindle info file reader and platform collaborators
//! - `pids` - candidate list orchestration
//! - `config` - configuration file and the configured platform

uniffi::setup_scaffolding!();

pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod pids;

pub use config::{ConfiguredPlatform, PidConfig, ProtectionMode};
pub use error::{PidError, Result};
pub use keystore::{describe_key_store, KeyStore, KeyStoreEntry, KeyStorePlatform, StoreFlavor};
pub use pids::{derive_pid_candidates, PidGenerator, PidRequest};

/// Candidate PIDs from e-ink Kindle serial numbers only
///
/// For hosts without Kindle info files (mobile apps). Same order as the
/// serial branch of [`derive_pid_candidates`], followed by `literal_pids`.
#[uniffi::export]
pub fn serial_pid_candidates(
    rec209: Option<Vec<u8>>,
    token: Vec<u8>,
    serials: Vec<String>,
    literal_pids: Vec<String>,
) -> Vec<String> {
    let token_pair = rec209.as_deref().map(|rec209| (rec209, token.as_slice()));

    let mut candidates: Vec<String> = serials
        .iter()
        .flat_map(|serial| pids::serial_pids(serial, token_pair))
        .collect();
    candidates.extend(literal_pids);
    candidates
}
