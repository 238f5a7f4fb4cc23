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


//! Kindle info file reader
//!
//! # File format
//! - One leading marker byte, ignored
//! - Records separated by the flavor's delimiter (`{` or `[`)
//! - Each record is `hashed_name:encoded_value`
//!
//! Record names are `encode_hash(plaintext_name, record_alphabet)`. Values are
//! record-alphabet encoded blobs wrapped in OS-level protection; on Kindle for
//! Mac the unwrapped cleartext is identity-alphabet encoded once more.
//!
//! Records without a `:` are skipped. A malformed store therefore shows up as
//! a missing record at lookup time rather than as a parse failure.

use crate::crypto::alphabet::{decode, encode_hash, IDENTITY_ALPHABET};
use crate::error::{PidError, Result};
use crate::keystore::platform::{KeyStorePlatform, StoreFlavor, UNWRAP_CONTEXT};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Record holding the device's random number (part of the DSN)
pub const MAZAMA_RANDOM_NUMBER: &str = "MazamaRandomNumber";

/// Record holding the Amazon account token
pub const ACCOUNT_TOKENS: &str = "kindle.account.tokens";

/// Plaintext names of the records a Kindle info file is known to hold
pub const KNOWN_RECORD_NAMES: [&str; 10] = [
    ACCOUNT_TOKENS,
    "kindle.cookie.item",
    "eulaVersionAccepted",
    "login_date",
    "kindle.token.item",
    "login",
    "kindle.key.item",
    "kindle.name.info",
    "kindle.device.info",
    MAZAMA_RANDOM_NUMBER,
];

/// Label used by the diagnostic dump for records with an unknown name
pub const UNKNOWN_RECORD: &str = "Unknown Record";

/// One `hashed_name:encoded_value` record as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreRecord {
    pub hashed_name: String,
    pub encrypted_value: String,
}

/// Parsed Kindle info file
#[derive(Debug, Clone)]
pub struct KeyStore {
    flavor: StoreFlavor,
    records: Vec<KeyStoreRecord>,
    index: HashMap<String, usize>,
}

impl KeyStore {
    /// Parse raw store bytes
    ///
    /// A repeated record name keeps its first position and the last value.
    /// Bytes that are not UTF-8 are replaced, so such records only miss at
    /// lookup time.
    ///
    /// # Errors
    /// - KeyStoreParse if the data is empty
    pub fn parse(raw: &[u8], flavor: StoreFlavor) -> Result<Self> {
        let Some((_marker, body)) = raw.split_first() else {
            return Err(PidError::parse("key store is empty"));
        };

        let mut store = Self {
            flavor,
            records: Vec::new(),
            index: HashMap::new(),
        };

        let delimiter = flavor.record_delimiter() as u8;
        for item in body.split(|&b| b == delimiter) {
            let mut fields = item.split(|&b| b == b':');
            let (Some(name), Some(value)) = (fields.next(), fields.next()) else {
                if !item.is_empty() {
                    debug!(len = item.len(), "Skipping key store record without a value");
                }
                continue;
            };
            store.insert(&String::from_utf8_lossy(name), &String::from_utf8_lossy(value));
        }

        debug!(records = store.records.len(), ?flavor, "Parsed key store");
        Ok(store)
    }

    /// Read and parse a store through the platform
    ///
    /// # Errors
    /// - KeyStoreIo if the platform cannot read the file
    /// - KeyStoreParse if the contents are not a record set
    pub fn open<P: KeyStorePlatform + ?Sized>(platform: &P, path: &Path) -> Result<Self> {
        let raw = platform.open_key_store(path)?;
        Self::parse(&raw, platform.flavor())
    }

    fn insert(&mut self, name: &str, value: &str) {
        match self.index.get(name) {
            Some(&position) => self.records[position].encrypted_value = value.to_string(),
            None => {
                self.index.insert(name.to_string(), self.records.len());
                self.records.push(KeyStoreRecord {
                    hashed_name: name.to_string(),
                    encrypted_value: value.to_string(),
                });
            }
        }
    }

    /// Layout this store was parsed with
    pub fn flavor(&self) -> StoreFlavor {
        self.flavor
    }

    /// Records in file order
    pub fn records(&self) -> &[KeyStoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored value for a hashed record name
    pub fn encrypted_value(&self, hashed_name: &str) -> Option<&str> {
        self.index
            .get(hashed_name)
            .map(|&position| self.records[position].encrypted_value.as_str())
    }

    /// Decode and unwrap the record stored under `hashed_name`
    ///
    /// # Errors
    /// - RecordNotFound if no record has that name
    /// - UnwrapFailed if the platform cannot remove the protection
    pub fn value_for_hash<P: KeyStorePlatform + ?Sized>(
        &self,
        platform: &P,
        hashed_name: &str,
    ) -> Result<Vec<u8>> {
        let encoded = self
            .encrypted_value(hashed_name)
            .ok_or_else(|| PidError::not_found(hashed_name))?;
        self.unwrap_value(platform, encoded)
    }

    /// Decode and unwrap the record with plaintext name `name`
    ///
    /// # Errors
    /// - RecordNotFound if the store has no such record
    /// - UnwrapFailed if the platform cannot remove the protection
    pub fn value_for_name<P: KeyStorePlatform + ?Sized>(
        &self,
        platform: &P,
        name: &str,
    ) -> Result<Vec<u8>> {
        let hashed_name = encode_hash(name.as_bytes(), self.flavor.record_alphabet());
        let encoded = self
            .encrypted_value(&hashed_name)
            .ok_or_else(|| PidError::not_found(name))?;
        self.unwrap_value(platform, encoded)
    }

    fn unwrap_value<P: KeyStorePlatform + ?Sized>(
        &self,
        platform: &P,
        encoded: &str,
    ) -> Result<Vec<u8>> {
        let encrypted = decode(encoded.as_bytes(), self.flavor.record_alphabet());
        let cleartext = platform.remove_protection(&encrypted, UNWRAP_CONTEXT)?;

        if self.flavor.decodes_after_unwrap() {
            Ok(decode(&cleartext, IDENTITY_ALPHABET))
        } else {
            Ok(cleartext)
        }
    }
}

/// Plaintext name of a hashed record name, if it is one of the known records
pub fn identify_record_name(hashed_name: &str, flavor: StoreFlavor) -> Option<&'static str> {
    KNOWN_RECORD_NAMES
        .iter()
        .copied()
        .find(|name| encode_hash(name.as_bytes(), flavor.record_alphabet()) == hashed_name)
}

/// Record of the diagnostic dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreEntry {
    /// Plaintext record name, or [`UNKNOWN_RECORD`]
    pub label: String,
    /// Decoded, unwrapped value
    pub value: Vec<u8>,
}

impl KeyStoreEntry {
    /// Value as lowercase hex
    pub fn value_hex(&self) -> String {
        hex::encode(&self.value)
    }
}

/// Decode every record of a store for human inspection
///
/// Entries come in file order. Records whose value cannot be unwrapped are
/// left out.
///
/// # Errors
/// - KeyStoreIo / KeyStoreParse if the store cannot be opened
pub fn describe_key_store<P: KeyStorePlatform + ?Sized>(
    platform: &P,
    path: &Path,
) -> Result<Vec<KeyStoreEntry>> {
    let store = KeyStore::open(platform, path)?;
    let mut entries = Vec::with_capacity(store.len());

    for record in store.records() {
        let label = identify_record_name(&record.hashed_name, store.flavor())
            .unwrap_or(UNKNOWN_RECORD)
            .to_string();

        match store.value_for_hash(platform, &record.hashed_name) {
            Ok(value) => entries.push(KeyStoreEntry { label, value }),
            Err(e) => warn!(record = %label, error = %e, "Skipping unreadable key store record"),
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::alphabet::encode;
    use std::path::PathBuf;

    const MASK: u8 = 0x5A;

    struct XorPlatform(StoreFlavor);

    impl KeyStorePlatform for XorPlatform {
        fn flavor(&self) -> StoreFlavor {
            self.0
        }

        fn default_key_store_path(&self) -> Option<PathBuf> {
            None
        }

        fn remove_protection(&self, blob: &[u8], context: &[u8]) -> Result<Vec<u8>> {
            if context != UNWRAP_CONTEXT {
                return Err(PidError::unwrap_failed("wrong entropy"));
            }
            if blob.is_empty() {
                return Err(PidError::unwrap_failed("empty blob"));
            }
            Ok(blob.iter().map(|b| b ^ MASK).collect())
        }

        fn user_name(&self) -> Result<String> {
            Ok("reader".to_string())
        }

        fn volume_serial_number(&self) -> Result<String> {
            Ok("9A3F27B1".to_string())
        }
    }

    fn stored_value(flavor: StoreFlavor, cleartext: &[u8]) -> String {
        let inner = if flavor.decodes_after_unwrap() {
            encode(cleartext, IDENTITY_ALPHABET).into_bytes()
        } else {
            cleartext.to_vec()
        };
        let protected: Vec<u8> = inner.iter().map(|b| b ^ MASK).collect();
        encode(&protected, flavor.record_alphabet())
    }

    fn store_bytes(flavor: StoreFlavor, records: &[(&str, &[u8])]) -> Vec<u8> {
        let body: Vec<String> = records
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}:{}",
                    encode_hash(name.as_bytes(), flavor.record_alphabet()),
                    stored_value(flavor, value)
                )
            })
            .collect();
        let delimiter = flavor.record_delimiter().to_string();
        format!("X{}", body.join(delimiter.as_str())).into_bytes()
    }

    #[test]
    fn test_parse_splits_records() {
        let store = KeyStore::parse(b"Xab:cd{ef:gh", StoreFlavor::Windows).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.encrypted_value("ab"), Some("cd"));
        assert_eq!(store.encrypted_value("ef"), Some("gh"));
        assert_eq!(store.records()[1].hashed_name, "ef");
    }

    #[test]
    fn test_parse_uses_flavor_delimiter() {
        let store = KeyStore::parse(b"Xab:cd[ef:gh{ij:kl", StoreFlavor::Mac).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.encrypted_value("ef"), Some("gh{ij"));
    }

    #[test]
    fn test_parse_skips_malformed_records() {
        let store = KeyStore::parse(b"Xgarbage{ab:cd:ef{{", StoreFlavor::Windows).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.encrypted_value("ab"), Some("cd"));
        assert_eq!(store.encrypted_value("garbage"), None);
    }

    #[test]
    fn test_parse_duplicate_keeps_last_value() {
        let store = KeyStore::parse(b"Xab:1{cd:2{ab:3", StoreFlavor::Windows).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.encrypted_value("ab"), Some("3"));
        assert_eq!(store.records()[0].hashed_name, "ab");
    }

    #[test]
    fn test_parse_rejects_only_empty_input() {
        assert!(matches!(
            KeyStore::parse(b"", StoreFlavor::Windows),
            Err(PidError::KeyStoreParse(_))
        ));
        assert!(KeyStore::parse(b"X", StoreFlavor::Windows).unwrap().is_empty());
    }

    #[test]
    fn test_parse_keeps_records_around_binary_junk() {
        let store = KeyStore::parse(b"Xab:cd{\xFF\xFE:\x80{junk:\xFF\xFE{ef:gh", StoreFlavor::Windows).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.encrypted_value("ab"), Some("cd"));
        assert_eq!(store.encrypted_value("ef"), Some("gh"));
        assert_eq!(store.encrypted_value("junk"), Some("\u{FFFD}\u{FFFD}"));
    }

    #[test]
    fn test_binary_junk_record_does_not_hide_valid_records() {
        let platform = XorPlatform(StoreFlavor::Windows);
        let mut raw = store_bytes(
            StoreFlavor::Windows,
            &[(MAZAMA_RANDOM_NUMBER, b"mazama-bytes".as_slice()), (ACCOUNT_TOKENS, b"token".as_slice())],
        );
        raw.extend_from_slice(b"{junk:\xFF\xFE");

        let store = KeyStore::parse(&raw, StoreFlavor::Windows).unwrap();
        assert_eq!(
            store.value_for_name(&platform, MAZAMA_RANDOM_NUMBER).unwrap(),
            b"mazama-bytes"
        );
        assert_eq!(store.value_for_name(&platform, ACCOUNT_TOKENS).unwrap(), b"token");
    }

    #[test]
    fn test_value_for_name_both_flavors() {
        for flavor in [StoreFlavor::Windows, StoreFlavor::Mac] {
            let platform = XorPlatform(flavor);
            let raw = store_bytes(
                flavor,
                &[(MAZAMA_RANDOM_NUMBER, b"mazama-bytes".as_slice()), (ACCOUNT_TOKENS, b"token".as_slice())],
            );
            let store = KeyStore::parse(&raw, flavor).unwrap();
            assert_eq!(
                store.value_for_name(&platform, MAZAMA_RANDOM_NUMBER).unwrap(),
                b"mazama-bytes"
            );
            assert_eq!(store.value_for_name(&platform, ACCOUNT_TOKENS).unwrap(), b"token");
        }
    }

    #[test]
    fn test_value_for_name_missing_record() {
        let platform = XorPlatform(StoreFlavor::Windows);
        let raw = store_bytes(StoreFlavor::Windows, &[(ACCOUNT_TOKENS, b"token".as_slice())]);
        let store = KeyStore::parse(&raw, StoreFlavor::Windows).unwrap();
        let err = store.value_for_name(&platform, MAZAMA_RANDOM_NUMBER).unwrap_err();
        assert!(matches!(err, PidError::RecordNotFound(ref name) if name == MAZAMA_RANDOM_NUMBER));
    }

    #[test]
    fn test_unwrap_failure_propagates() {
        let platform = XorPlatform(StoreFlavor::Windows);
        let hashed = encode_hash(MAZAMA_RANDOM_NUMBER.as_bytes(), StoreFlavor::Windows.record_alphabet());
        // value decodes to nothing, which the platform refuses
        let raw = format!("X{}:!!", hashed).into_bytes();
        let store = KeyStore::parse(&raw, StoreFlavor::Windows).unwrap();
        let err = store.value_for_name(&platform, MAZAMA_RANDOM_NUMBER).unwrap_err();
        assert!(matches!(err, PidError::UnwrapFailed(_)));
    }

    #[test]
    fn test_identify_record_name() {
        for flavor in [StoreFlavor::Windows, StoreFlavor::Mac] {
            for name in KNOWN_RECORD_NAMES {
                let hashed = encode_hash(name.as_bytes(), flavor.record_alphabet());
                assert_eq!(identify_record_name(&hashed, flavor), Some(name));
            }
            assert_eq!(identify_record_name("not-a-hash", flavor), None);
        }
        assert_eq!(
            identify_record_name("avalzbzkAcAPAQA5ApZgaOZPzQZzaiaO", StoreFlavor::Windows),
            Some(MAZAMA_RANDOM_NUMBER)
        );
    }

    #[test]
    fn test_describe_key_store_labels_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kindle.info");
        let platform = XorPlatform(StoreFlavor::Mac);

        let mut raw = store_bytes(
            StoreFlavor::Mac,
            &[(ACCOUNT_TOKENS, b"token".as_slice()), ("some.other.record", b"other".as_slice())],
        );
        // trailing record that cannot be unwrapped
        raw.extend_from_slice(b"[zz:!!");
        std::fs::write(&path, raw).unwrap();

        let entries = describe_key_store(&platform, &path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, ACCOUNT_TOKENS);
        assert_eq!(entries[0].value, b"token");
        assert_eq!(entries[0].value_hex(), "746f6b656e");
        assert_eq!(entries[1].label, UNKNOWN_RECORD);
        assert_eq!(entries[1].value, b"other");
    }

    #[test]
    fn test_describe_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let platform = XorPlatform(StoreFlavor::Windows);
        let err = describe_key_store(&platform, &dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, PidError::KeyStoreIo { .. }));
    }
}
