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


//! PID derivation primitives
//!
//! This module holds the bit-level building blocks of Kindle PID derivation.
//! Everything here is a pure function of its inputs.
//!
//! # Components
//! - `alphabet` - byte codec over small custom alphabets, plus MD5 name hashing
//! - `checksum` - CRC-32 register and the two-symbol PID checksum
//! - `bitfield` - 2-bit/6-bit field reader
//! - `pid` - book, device and legacy serial PID generators

pub mod alphabet;
pub mod bitfield;
pub mod checksum;
pub mod pid;

// Re-export commonly used items from the alphabet module
pub use alphabet::{
    decode,
    encode,
    encode_hash,
    Alphabet,
    IDENTITY_ALPHABET,
    MAC_RECORD_ALPHABET,
    WINDOWS_RECORD_ALPHABET,
};

// Re-export checksum helpers
pub use checksum::{checksum_pid, crc32};

// Re-export PID generators
pub use pid::{
    book_pid,
    encode_pid,
    generate_device_pid,
    legacy_serial_pid,
    pid_from_serial,
    PidEncryptionTable,
};
