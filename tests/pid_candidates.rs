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


//! Integration tests for PID candidate derivation
//!
//! Kindle info files are written to a temporary directory with an XOR mask
//! standing in for the OS-level protection.

use kindle_pids::crypto::alphabet::{encode, encode_hash, IDENTITY_ALPHABET};
use kindle_pids::crypto::checksum::PID_CHECKSUM_SYMBOLS;
use kindle_pids::keystore::{ACCOUNT_TOKENS, MAZAMA_RANDOM_NUMBER};
use kindle_pids::{
    derive_pid_candidates, describe_key_store, KeyStorePlatform, PidError, PidRequest, Result,
    StoreFlavor,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MASK: u8 = 0x5A;
const MAZAMA: &[u8] = b"0123456789abcdef0123456789abcdef";
const ACCOUNT: &[u8] = b"ACCOUNT-TOKEN";
const REC209: &[u8] = b"rec209-data";
const TOKEN: &[u8] = b"exth-token";
const SERIAL: &str = "B001A0B2C3D4E5F6";

/// Device PID and the three book PIDs of the fixture store
const STORE_PIDS: [&str; 4] = ["WDIBDTSUDJ", "w5Pltxt4R6", "aNlDk0RnHH", "89qR9U9w4X"];
/// Book PID and legacy PID of SERIAL
const SERIAL_PIDS: [&str; 2] = ["EchL/wZyMV", "DCT2CUF*GS"];

struct XorPlatform {
    flavor: StoreFlavor,
    default_store: Option<PathBuf>,
    unwrap_works: bool,
}

impl XorPlatform {
    fn new(flavor: StoreFlavor) -> Self {
        Self {
            flavor,
            default_store: None,
            unwrap_works: true,
        }
    }
}

impl KeyStorePlatform for XorPlatform {
    fn flavor(&self) -> StoreFlavor {
        self.flavor
    }

    fn default_key_store_path(&self) -> Option<PathBuf> {
        self.default_store.clone()
    }

    fn remove_protection(&self, blob: &[u8], _context: &[u8]) -> Result<Vec<u8>> {
        if !self.unwrap_works {
            return Err(PidError::unwrap_failed("blob protected for another user"));
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

fn write_store(dir: &TempDir, file_name: &str, flavor: StoreFlavor, records: &[(&str, &[u8])]) -> PathBuf {
    let body: Vec<String> = records
        .iter()
        .map(|(name, cleartext)| {
            let inner = if flavor.decodes_after_unwrap() {
                encode(cleartext, IDENTITY_ALPHABET).into_bytes()
            } else {
                cleartext.to_vec()
            };
            let protected: Vec<u8> = inner.iter().map(|b| b ^ MASK).collect();
            format!(
                "{}:{}",
                encode_hash(name.as_bytes(), flavor.record_alphabet()),
                encode(&protected, flavor.record_alphabet())
            )
        })
        .collect();

    let path = dir.path().join(file_name);
    let contents = format!("X{}", body.join(flavor.record_delimiter().to_string().as_str()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn full_store(dir: &TempDir, flavor: StoreFlavor) -> PathBuf {
    write_store(
        dir,
        "kindle.info",
        flavor,
        &[
            ("kindle.cookie.item", b"cookie".as_slice()),
            (MAZAMA_RANDOM_NUMBER, MAZAMA),
            (ACCOUNT_TOKENS, ACCOUNT),
        ],
    )
}

fn book_request(key_store_paths: Vec<PathBuf>) -> PidRequest {
    PidRequest {
        rec209: Some(REC209.to_vec()),
        token: TOKEN.to_vec(),
        key_store_paths,
        ..PidRequest::default()
    }
}

fn assert_checksummed(pid: &str) {
    assert_eq!(pid.len(), 10, "unexpected PID length: {}", pid);
    assert!(pid.as_bytes()[8..]
        .iter()
        .all(|b| PID_CHECKSUM_SYMBOLS.contains(b)));
}

#[test]
fn test_store_gives_device_pid_then_three_book_pids() {
    for flavor in [StoreFlavor::Windows, StoreFlavor::Mac] {
        let dir = tempfile::tempdir().unwrap();
        let path = full_store(&dir, flavor);
        let platform = XorPlatform::new(flavor);

        let pids = derive_pid_candidates(&platform, &book_request(vec![path]));

        assert_eq!(pids, STORE_PIDS, "flavor {:?}", flavor);
        for pid in &pids {
            assert_checksummed(pid);
        }
    }
}

#[test]
fn test_binary_junk_record_keeps_store_pids() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_store(&dir, StoreFlavor::Windows);
    let mut raw = std::fs::read(&path).unwrap();
    raw.extend_from_slice(b"{junk:\xFF\xFE");
    std::fs::write(&path, raw).unwrap();
    let platform = XorPlatform::new(StoreFlavor::Windows);

    let pids = derive_pid_candidates(&platform, &book_request(vec![path]));

    assert_eq!(pids, STORE_PIDS);
}

#[test]
fn test_serial_and_token_pair_give_two_pids() {
    let platform = XorPlatform::new(StoreFlavor::Windows);
    let request = PidRequest {
        serials: vec![SERIAL.to_string()],
        ..book_request(Vec::new())
    };

    let pids = derive_pid_candidates(&platform, &request);

    assert_eq!(pids, SERIAL_PIDS);
    assert!(pids[1].ends_with("*GS"));
}

#[test]
fn test_candidate_order_across_branches() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_store(&dir, StoreFlavor::Windows);
    let mut platform = XorPlatform::new(StoreFlavor::Windows);
    platform.default_store = Some(path.clone());

    let request = PidRequest {
        use_device_defaults: true,
        serials: vec![SERIAL.to_string()],
        literal_pids: vec!["LITERAL123".to_string()],
        ..book_request(vec![path])
    };

    let pids = derive_pid_candidates(&platform, &request);

    let mut expected: Vec<&str> = Vec::new();
    expected.extend(STORE_PIDS);
    expected.extend(STORE_PIDS);
    expected.extend(SERIAL_PIDS);
    expected.push("LITERAL123");
    assert_eq!(pids, expected);
}

#[test]
fn test_store_without_rec209_gives_device_pid_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_store(&dir, StoreFlavor::Windows);
    let platform = XorPlatform::new(StoreFlavor::Windows);

    let request = PidRequest {
        rec209: None,
        serials: vec![SERIAL.to_string()],
        ..book_request(vec![path])
    };

    let pids = derive_pid_candidates(&platform, &request);
    assert_eq!(pids, vec![STORE_PIDS[0], SERIAL_PIDS[1]]);
}

#[test]
fn test_missing_account_token_keeps_device_pid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(&dir, "kindle.info", StoreFlavor::Windows, &[(MAZAMA_RANDOM_NUMBER, MAZAMA)]);
    let platform = XorPlatform::new(StoreFlavor::Windows);

    let pids = derive_pid_candidates(&platform, &book_request(vec![path]));
    assert_eq!(pids, vec![STORE_PIDS[0]]);
}

#[test]
fn test_missing_mazama_abandons_store_only() {
    let dir = tempfile::tempdir().unwrap();
    let incomplete = write_store(&dir, "incomplete.info", StoreFlavor::Windows, &[(ACCOUNT_TOKENS, ACCOUNT)]);
    let complete = full_store(&dir, StoreFlavor::Windows);
    let platform = XorPlatform::new(StoreFlavor::Windows);

    let pids = derive_pid_candidates(&platform, &book_request(vec![incomplete, complete]));
    assert_eq!(pids, STORE_PIDS);
}

#[test]
fn test_unwrap_failure_abandons_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_store(&dir, StoreFlavor::Windows);
    let mut platform = XorPlatform::new(StoreFlavor::Windows);
    platform.unwrap_works = false;

    let request = PidRequest {
        serials: vec![SERIAL.to_string()],
        ..book_request(vec![path])
    };

    assert_eq!(derive_pid_candidates(&platform, &request), SERIAL_PIDS);
}

#[test]
fn test_unreadable_and_empty_stores_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.info");
    std::fs::write(&empty, b"").unwrap();
    let missing = dir.path().join("missing.info");
    let platform = XorPlatform::new(StoreFlavor::Windows);

    let request = PidRequest {
        literal_pids: vec!["LITERAL123".to_string()],
        ..book_request(vec![missing, empty])
    };

    assert_eq!(derive_pid_candidates(&platform, &request), vec!["LITERAL123"]);
}

#[test]
fn test_describe_key_store_names_known_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_store(&dir, StoreFlavor::Mac);
    let platform = XorPlatform::new(StoreFlavor::Mac);

    let entries = describe_key_store(&platform, &path).unwrap();
    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["kindle.cookie.item", MAZAMA_RANDOM_NUMBER, ACCOUNT_TOKENS]);
    assert_eq!(entries[1].value, MAZAMA);
    assert_eq!(entries[2].value, ACCOUNT);
}

#[test]
fn test_describe_key_store_reports_missing_file() {
    let platform = XorPlatform::new(StoreFlavor::Windows);
    let err = describe_key_store(&platform, Path::new("/nonexistent/kindle.info")).unwrap_err();
    assert!(err.is_key_store_error());
}
