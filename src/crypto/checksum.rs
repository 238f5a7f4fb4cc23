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


//! CRC-32 and the PID checksum suffix
//!
//! The CRC used throughout PID derivation is the reflected `0xEDB88320`
//! register started at zero and returned without the final complement,
//! i.e. `!zlib_crc32(data, 0xFFFFFFFF)`.

/// Symbols of device PIDs, legacy serial PIDs and checksum suffixes
///
/// The letter `O` is left out.
pub const PID_CHECKSUM_SYMBOLS: &[u8; 34] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ123456789";

/// CRC-32 register over `data`
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(0xFFFF_FFFF);
    hasher.update(data);
    !hasher.finalize()
}

/// Append the two-symbol checksum to a PID
///
/// An 8-symbol PID becomes the 10-symbol form handed to decryption.
///
/// # Example
/// ```
/// use kindle_pids::crypto::checksum::checksum_pid;
///
/// assert_eq!(checksum_pid("ABCDEFGH"), "ABCDEFGHHA");
/// ```
pub fn checksum_pid(pid: &str) -> String {
    let mut crc = crc32(pid.as_bytes());
    crc ^= crc >> 16;

    let base = PID_CHECKSUM_SYMBOLS.len() as u32;
    let mut result = String::with_capacity(pid.len() + 2);
    result.push_str(pid);

    for _ in 0..2 {
        let b = crc & 0xFF;
        let pos = (b / base) ^ (b % base);
        result.push(PID_CHECKSUM_SYMBOLS[(pos % base) as usize] as char);
        crc >>= 8;
    }

    result
}
