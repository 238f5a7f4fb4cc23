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


//! Kindle info key store
//!
//! This module reads the record set Kindle for PC/Mac keeps on disk: the
//! device random number, account tokens and a handful of other records, each
//! under an MD5-hashed name and wrapped in OS-level protection.
//!
//! # Components
//! - `platform` - store flavors and the OS collaborator interface
//! - `reader` - parsing, record lookup and the diagnostic dump

pub mod platform;
pub mod reader;

// Re-export commonly used types
pub use platform::{KeyStorePlatform, StoreFlavor, UNWRAP_CONTEXT};
pub use reader::{
    describe_key_store,
    identify_record_name,
    KeyStore,
    KeyStoreEntry,
    KeyStoreRecord,
    ACCOUNT_TOKENS,
    KNOWN_RECORD_NAMES,
    MAZAMA_RANDOM_NUMBER,
};
