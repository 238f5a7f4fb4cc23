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


//! PID generators
//!
//! Three derivations produce the 8-symbol (or 7-symbol plus `*`) PID body
//! that [`checksum_pid`] then completes:
//!
//! - **Book PID**: SHA-1 over identity material and the book's header token
//!   pair, written with 6-bit symbols ([`encode_pid`]).
//! - **Device PID**: a CRC-table seed rolled with the derived device serial
//!   ([`generate_device_pid`]). Emitted by every Kindle for PC/Mac store even
//!   though no known book decrypts with it.
//! - **Legacy serial PID**: the fixed PID of e-ink Kindles on firmware older
//!   than 2.5 ([`pid_from_serial`]).

use crate::crypto::bitfield::six_bits;
use crate::crypto::checksum::{checksum_pid, crc32, PID_CHECKSUM_SYMBOLS};
use crate::error::{PidError, Result};
use sha1::{Digest, Sha1};
use std::sync::OnceLock;

/// Symbols of book PIDs (the standard base64 alphabet)
pub const BOOK_PID_SYMBOLS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Number of DSN bytes rolled into the device PID by Kindle for PC/Mac
pub const DEVICE_PID_ROLLS: usize = 4;

/// Length of the legacy serial PID body, before `*` and the checksum
pub const LEGACY_PID_LEN: usize = 7;

const PID_LEN: usize = 8;

/// Write the first 48 bits of a SHA-1 digest as 8 book PID symbols
///
/// The remaining 14 bytes of the digest are not used.
pub fn encode_pid(hash: &[u8; 20]) -> String {
    (0..PID_LEN)
        .map(|position| BOOK_PID_SYMBOLS[usize::from(six_bits(hash, position))] as char)
        .collect()
}

/// SHA-1 the concatenated parts and return the checksummed book PID
///
/// # Example
/// ```
/// use kindle_pids::crypto::pid::book_pid;
///
/// let pid = book_pid(&[b"B001A0B2C3D4E5F6", b"rec209-data", b"exth-token"]);
/// assert_eq!(pid, "EchL/wZyMV");
/// ```
pub fn book_pid(parts: &[&[u8]]) -> String {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&hasher.finalize());
    checksum_pid(&encode_pid(&hash))
}

/// Lookup table of the reflected CRC-32 polynomial `0xEDB88320`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidEncryptionTable([u32; 256]);

impl PidEncryptionTable {
    /// Build the table
    pub fn build() -> Self {
        let mut table = [0u32; 256];
        for (entry, slot) in table.iter_mut().enumerate() {
            let mut value = entry as u32;
            for _ in 0..8 {
                value = if value & 1 == 0 {
                    value >> 1
                } else {
                    (value >> 1) ^ 0xEDB8_8320
                };
            }
            *slot = value;
        }
        Self(table)
    }

    /// Process-wide table, built on first use
    pub fn shared() -> &'static Self {
        static TABLE: OnceLock<PidEncryptionTable> = OnceLock::new();
        TABLE.get_or_init(Self::build)
    }

    /// Table entry for `index`
    pub fn entry(&self, index: u8) -> u32 {
        self.0[usize::from(index)]
    }
}

/// Seed of the device PID: the CRC register over the first four DSN bytes
pub fn pid_seed(table: &PidEncryptionTable, dsn: &[u8; 4]) -> u32 {
    dsn.iter().fold(0u32, |value, &byte| {
        let index = (u32::from(byte) ^ value) as u8;
        (value >> 8) ^ table.entry(index)
    })
}

/// Map one mixed byte onto the PID checksum symbols
fn pid_symbol(byte: u8) -> char {
    let index = usize::from((((byte >> 5) & 3) ^ byte) & 0x1F) + usize::from(byte >> 7);
    PID_CHECKSUM_SYMBOLS[index] as char
}

/// Generate the 8-symbol device PID
///
/// The seed is written big-endian twice into an 8-byte buffer, then the first
/// `roll_count` DSN bytes are XORed in cyclically.
///
/// # Errors
/// - InvalidInput if `dsn` is shorter than 4 bytes or than `roll_count`
pub fn generate_device_pid(
    table: &PidEncryptionTable,
    dsn: &[u8],
    roll_count: usize,
) -> Result<String> {
    let needed = roll_count.max(4);
    if dsn.len() < needed {
        return Err(PidError::invalid_input(format!(
            "device serial too short for device PID: {} bytes, need {}",
            dsn.len(),
            needed
        )));
    }

    let head = [dsn[0], dsn[1], dsn[2], dsn[3]];
    let seed = pid_seed(table, &head).to_be_bytes();

    let mut pid = [0u8; PID_LEN];
    pid[..4].copy_from_slice(&seed);
    pid[4..].copy_from_slice(&seed);

    for (counter, &byte) in dsn[..roll_count].iter().enumerate() {
        pid[counter % PID_LEN] ^= byte;
    }

    Ok(pid.iter().map(|&b| pid_symbol(b)).collect())
}

/// Fixed PID of an old e-ink Kindle, derived from its serial number
///
/// The result always has `len` symbols, whatever the serial length. The
/// caller appends `*` before checksumming.
pub fn pid_from_serial(serial: &[u8], len: usize) -> String {
    if len == 0 {
        return String::new();
    }

    let crc_bytes = crc32(serial).to_be_bytes();
    let mut mixed = vec![0u8; len];

    for (i, &byte) in serial.iter().enumerate() {
        mixed[i % len] ^= byte;
    }
    for (i, slot) in mixed.iter_mut().enumerate() {
        *slot ^= crc_bytes[i & 3];
    }

    mixed.into_iter().map(pid_symbol).collect()
}

/// Checksummed legacy PID for a serial: `pid_from_serial(serial, 7) + "*"`
pub fn legacy_serial_pid(serial: &[u8]) -> String {
    let mut pid = pid_from_serial(serial, LEGACY_PID_LEN);
    pid.push('*');
    checksum_pid(&pid)
}
