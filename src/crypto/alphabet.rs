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


//! Alphabet codec
//!
//! Every value stored in a Kindle info file, and the device serial derived
//! from it, is written with a small custom alphabet: one byte becomes two
//! symbols. The codec is only a bijection for power-of-two alphabets, which
//! is what [`Alphabet::new`] accepts.
//!
//! # Encoding
//! For a byte `v` and an alphabet of base `N`:
//! - high symbol: `alphabet[(v ^ 0x80) / N]`
//! - low symbol: `alphabet[v % N]`
//!
//! # Decoding
//! Pairs are read left to right. Decoding stops at the first pair holding a
//! symbol outside the alphabet and returns the bytes decoded so far; a
//! trailing odd symbol is ignored. Stores contain records that hit this
//! path, so it must not be turned into an error.

use crate::error::{PidError, Result};
use md5::{Digest, Md5};

/// Ordered set of distinct ASCII symbols used by the byte codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alphabet(&'static str);

/// Alphabet for identity hashes and the derived device serial
pub const IDENTITY_ALPHABET: Alphabet = Alphabet("n5Pr6St7Uv8Wx9YzAb0Cd1Ef2Gh3Jk4M");

/// Record alphabet of Kindle for PC info files
pub const WINDOWS_RECORD_ALPHABET: Alphabet =
    Alphabet("AaZzB0bYyCc1XxDdW2wEeVv3FfUuG4g-TtHh5SsIiR6rJjQq7KkPpL8lOoMm9Nn_");

/// Record alphabet of Kindle for Mac info files
pub const MAC_RECORD_ALPHABET: Alphabet =
    Alphabet("ZB0bYyc1xDdW2wEV3Ff7KkPpL8UuGA4gz-Tme9Nn_tHh5SvXCsIiR6rJjQaqlOoM");

impl Alphabet {
    /// Create an alphabet from a symbol string
    ///
    /// # Errors
    /// - InvalidInput if the symbols are not ASCII, not distinct, or their
    ///   count is not a power of two between 16 and 128
    pub fn new(symbols: &'static str) -> Result<Self> {
        if !symbols.is_ascii() {
            return Err(PidError::invalid_input("alphabet symbols must be ASCII"));
        }

        let base = symbols.len();
        if !base.is_power_of_two() || !(16..=128).contains(&base) {
            return Err(PidError::invalid_input(format!(
                "alphabet size must be a power of two between 16 and 128, got {}",
                base
            )));
        }

        let bytes = symbols.as_bytes();
        for (i, symbol) in bytes.iter().enumerate() {
            if bytes[i + 1..].contains(symbol) {
                return Err(PidError::invalid_input(format!(
                    "duplicate alphabet symbol '{}'",
                    *symbol as char
                )));
            }
        }

        Ok(Self(symbols))
    }

    /// Numeric base of the codec (number of symbols)
    pub fn base(&self) -> usize {
        self.0.len()
    }

    /// The symbols in order
    pub fn symbols(&self) -> &'static str {
        self.0
    }

    fn symbol(&self, index: usize) -> char {
        self.0.as_bytes()[index] as char
    }

    fn index_of(&self, symbol: u8) -> Option<usize> {
        self.0.bytes().position(|s| s == symbol)
    }
}

/// Encode bytes with the symbols of `alphabet`
///
/// The result is always twice as long as the input.
///
/// # Example
/// ```
/// use kindle_pids::crypto::alphabet::{encode, IDENTITY_ALPHABET};
///
/// assert_eq!(encode(&[0x00, 0xFF], IDENTITY_ALPHABET), "6nrM");
/// ```
pub fn encode(data: &[u8], alphabet: Alphabet) -> String {
    let base = alphabet.base();
    let mut result = String::with_capacity(data.len() * 2);

    for &value in data {
        let high = usize::from(value ^ 0x80) / base;
        let low = usize::from(value) % base;
        result.push(alphabet.symbol(high));
        result.push(alphabet.symbol(low));
    }

    result
}

/// Decode symbol pairs back to bytes
///
/// Stops silently at the first pair containing an unknown symbol.
pub fn decode(data: &[u8], alphabet: Alphabet) -> Vec<u8> {
    let base = alphabet.base();
    let mut result = Vec::with_capacity(data.len() / 2);

    for pair in data.chunks_exact(2) {
        let (Some(high), Some(low)) = (alphabet.index_of(pair[0]), alphabet.index_of(pair[1]))
        else {
            break;
        };

        // Fits a byte for every base Alphabet::new accepts
        let value = (((high * base) ^ 0x80) & 0xFF) + low;
        result.push(value as u8);
    }

    result
}

/// MD5 the input and encode the digest
///
/// Gives a 32-symbol, alphabet-safe name for arbitrary-length input. Key-store
/// record names are stored this way.
pub fn encode_hash(data: &[u8], alphabet: Alphabet) -> String {
    encode(&Md5::digest(data), alphabet)
}
