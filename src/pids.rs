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


//! PID candidate orchestration
//!
//! Builds the ordered list of PIDs a Mobipocket/Topaz decrypter should try
//! for one book. Two branches run independently and are concatenated:
//!
//! 1. **Key-store branch**, once per Kindle info file (the platform's
//!    default store first when device defaults are requested):
//!    - DSN = `encode(SHA1(mazama || encode_hash(volume_serial) || encode_hash(user_name)))`
//!    - device PID
//!    - with a token pair: book PIDs of `DSN||account||rec209||token`,
//!      `account||rec209||token` and `DSN||rec209||token`, in that order
//! 2. **Serial branch**, once per e-ink Kindle serial:
//!    - with a token pair: book PID of `serial||rec209||token`
//!    - always: the pre-2.5 firmware fixed PID
//!
//! Caller-supplied PIDs are appended unchanged at the end.
//!
//! A store that cannot be read, parsed or unwrapped only loses its own
//! candidates; the rest of the list is still produced. Duplicates are kept.

use crate::crypto::alphabet::{encode, encode_hash, IDENTITY_ALPHABET};
use crate::crypto::checksum::checksum_pid;
use crate::crypto::pid::{
    book_pid,
    generate_device_pid,
    legacy_serial_pid,
    PidEncryptionTable,
    DEVICE_PID_ROLLS,
};
use crate::error::Result;
use crate::keystore::platform::KeyStorePlatform;
use crate::keystore::reader::{KeyStore, ACCOUNT_TOKENS, MAZAMA_RANDOM_NUMBER};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Header token pair of a book: EXTH record 209 and the token it names
pub type TokenPair<'a> = (&'a [u8], &'a [u8]);

/// Inputs of one candidate derivation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidRequest {
    /// EXTH record 209 of the book, absent for non-K4 books
    pub rec209: Option<Vec<u8>>,
    /// Token assembled from the EXTH records named by record 209
    pub token: Vec<u8>,
    /// Also process the platform's own Kindle info file
    pub use_device_defaults: bool,
    /// PIDs appended as given
    pub literal_pids: Vec<String>,
    /// E-ink Kindle serial numbers
    pub serials: Vec<String>,
    /// Kindle info files
    pub key_store_paths: Vec<PathBuf>,
}

impl PidRequest {
    /// Token pair, present when the book carries record 209
    pub fn token_pair(&self) -> Option<TokenPair<'_>> {
        self.rec209
            .as_deref()
            .map(|rec209| (rec209, self.token.as_slice()))
    }
}

/// Derived device serial number
///
/// Identity-alphabet encoding of the SHA-1 of the Mazama random number and
/// the encoded hashes of the volume serial and user name (40 symbols).
pub fn derive_dsn(mazama_random_number: &[u8], volume_serial: &str, user_name: &str) -> String {
    let encoded_volume = encode_hash(volume_serial.as_bytes(), IDENTITY_ALPHABET);
    let encoded_user = encode_hash(user_name.as_bytes(), IDENTITY_ALPHABET);

    let mut hasher = Sha1::new();
    hasher.update(mazama_random_number);
    hasher.update(encoded_volume.as_bytes());
    hasher.update(encoded_user.as_bytes());

    encode(&hasher.finalize(), IDENTITY_ALPHABET)
}

/// PIDs of one e-ink Kindle serial number
///
/// The book PID (when a token pair is present) comes first, then the legacy
/// fixed PID.
pub fn serial_pids(serial: &str, token_pair: Option<TokenPair<'_>>) -> Vec<String> {
    let mut pids = Vec::with_capacity(2);

    if let Some((rec209, token)) = token_pair {
        pids.push(book_pid(&[serial.as_bytes(), rec209, token]));
    }
    pids.push(legacy_serial_pid(serial.as_bytes()));

    pids
}

/// Candidate generator bound to one platform
///
/// # Example
/// ```
/// use kindle_pids::config::{ConfiguredPlatform, PidConfig};
/// use kindle_pids::pids::{PidGenerator, PidRequest};
///
/// let platform = ConfiguredPlatform::new(PidConfig::default());
/// let request = PidRequest {
///     rec209: Some(b"rec209-data".to_vec()),
///     token: b"exth-token".to_vec(),
///     serials: vec!["B001A0B2C3D4E5F6".to_string()],
///     ..PidRequest::default()
/// };
///
/// let pids = PidGenerator::new(&platform).derive(&request);
/// assert_eq!(pids, vec!["EchL/wZyMV", "DCT2CUF*GS"]);
/// ```
pub struct PidGenerator<'a, P: KeyStorePlatform + ?Sized> {
    platform: &'a P,
    table: &'static PidEncryptionTable,
}

impl<'a, P: KeyStorePlatform + ?Sized> PidGenerator<'a, P> {
    pub fn new(platform: &'a P) -> Self {
        Self {
            platform,
            table: PidEncryptionTable::shared(),
        }
    }

    /// Derive the ordered candidate list
    ///
    /// Never fails: unusable stores are logged and skipped. No inputs at all
    /// give an empty list, meaning the book cannot be decrypted.
    pub fn derive(&self, request: &PidRequest) -> Vec<String> {
        let token_pair = request.token_pair();
        let mut pids = Vec::new();

        if request.use_device_defaults {
            match self.platform.default_key_store_path() {
                Some(path) => pids.extend(self.key_store_pids_or_skip(&path, token_pair)),
                None => warn!("No default Kindle info file on this platform"),
            }
        }

        for path in &request.key_store_paths {
            pids.extend(self.key_store_pids_or_skip(path, token_pair));
        }

        for serial in &request.serials {
            pids.extend(serial_pids(serial, token_pair));
        }

        pids.extend(request.literal_pids.iter().cloned());

        info!(candidates = pids.len(), "Derived PID candidates");
        debug!(?pids, "PID candidate list");
        pids
    }

    fn key_store_pids_or_skip(&self, path: &Path, token_pair: Option<TokenPair<'_>>) -> Vec<String> {
        match self.key_store_pids(path, token_pair) {
            Ok(pids) => pids,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping Kindle info file");
                Vec::new()
            }
        }
    }

    /// PIDs of one Kindle info file
    ///
    /// # Errors
    /// - KeyStoreIo / KeyStoreParse if the store cannot be opened
    /// - RecordNotFound if it has no Mazama random number
    /// - UnwrapFailed / IdentityUnavailable from the platform
    ///
    /// Once the device PID is derived, a missing account token no longer
    /// fails the store; the book variants are skipped instead.
    pub fn key_store_pids(&self, path: &Path, token_pair: Option<TokenPair<'_>>) -> Result<Vec<String>> {
        let store = KeyStore::open(self.platform, path)?;

        let mazama = store.value_for_name(self.platform, MAZAMA_RANDOM_NUMBER)?;
        let volume_serial = self.platform.volume_serial_number()?;
        let user_name = self.platform.user_name()?;
        let dsn = derive_dsn(&mazama, &volume_serial, &user_name);
        let dsn = dsn.as_bytes();

        let mut pids = Vec::with_capacity(4);
        let device_pid = generate_device_pid(self.table, dsn, DEVICE_PID_ROLLS)?;
        pids.push(checksum_pid(&device_pid));

        let Some((rec209, token)) = token_pair else {
            info!(path = %path.display(), "No EXTH record 209, perhaps not a K4 book");
            return Ok(pids);
        };

        let account = match store.value_for_name(self.platform, ACCOUNT_TOKENS) {
            Ok(account) => account,
            Err(e) if e.is_branch_local() => {
                warn!(path = %path.display(), error = %e, "No account token, skipping book PIDs");
                return Ok(pids);
            }
            Err(e) => return Err(e),
        };
        let account = account.as_slice();

        pids.push(book_pid(&[dsn, account, rec209, token]));
        pids.push(book_pid(&[account, rec209, token]));
        pids.push(book_pid(&[dsn, rec209, token]));

        Ok(pids)
    }
}

/// Derive the ordered candidate list for `request` on `platform`
pub fn derive_pid_candidates<P: KeyStorePlatform + ?Sized>(
    platform: &P,
    request: &PidRequest,
) -> Vec<String> {
    PidGenerator::new(platform).derive(request)
}
