//! Passphrase key derivation using scrypt
//!
//! scrypt is deliberately slow and memory-hard so that offline guessing of
//! the passphrase stays expensive.

use std::fmt;

use scrypt::{Params, scrypt};
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, KhefError, Result};

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Per-file random salt. Not secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    pub fn new(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds a salt from a slice that must be exactly `SALT_LEN` bytes.
    ///
    /// A wrong length is a bug in the caller, never a user error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            KhefError::invariant(format!(
                "salt must be {} bytes, got {}",
                SALT_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

/// Symmetric key derived from a passphrase. Wiped when dropped.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// scrypt cost parameters.
///
/// Format version 1 containers are always written with `KdfParams::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost N
    pub log_n: u8,
    /// block size
    pub r: u32,
    /// parallelization
    pub p: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use for real data.
    pub const fn insecure_fast() -> Self {
        Self {
            log_n: 4,
            r: 8,
            p: 1,
        }
    }
}

/// Derive a 32-byte key from a passphrase and salt
pub fn derive(passphrase: &[u8], salt: &Salt, params: &KdfParams) -> Result<DerivedKey> {
    let scrypt_params = Params::new(params.log_n, params.r, params.p, KEY_LEN).map_err(|e| {
        KhefError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("invalid scrypt parameters {:?}", params),
            e,
        )
    })?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(passphrase, salt.as_bytes(), &scrypt_params, &mut key[..]).map_err(|e| {
        KhefError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KdfFailure,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(DerivedKey(key))
}
