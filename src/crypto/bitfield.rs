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


//! Bit field reader used by the PID symbol encoder
//!
//! A buffer is read as a stream of 2-bit fields, most significant field
//! first within each byte. Three consecutive fields make one 6-bit symbol.

/// Two bits at field `offset`
///
/// # Panics
/// If `offset / 4` is past the end of `buffer`.
pub fn two_bits(buffer: &[u8], offset: usize) -> u8 {
    let byte_index = offset / 4;
    let shift = 6 - 2 * (offset % 4);
    (buffer[byte_index] >> shift) & 3
}

/// Six bits made of the fields `offset * 3`, `+1` and `+2`
///
/// # Panics
/// If the last field read is past the end of `buffer`.
pub fn six_bits(buffer: &[u8], offset: usize) -> u8 {
    let offset = offset * 3;
    (two_bits(buffer, offset) << 4) | (two_bits(buffer, offset + 1) << 2) | two_bits(buffer, offset + 2)
}
