//! On-disk container format
//!
//! The container is a fixed-order concatenation:
//! - magic: 4 bytes, `KHEF`
//! - version: 1 byte, currently 1
//! - salt: 16 bytes
//! - nonce: 24 bytes
//! - ciphertext: variable, same length as the plaintext
//! - tag: 16 bytes (Poly1305)
//!
//! The ciphertext length is implicit: whatever lies between the nonce and
//! the trailing tag.

use crate::cipher::{NONCE_LEN, Nonce, TAG_LEN, Tag};
use crate::error::{ErrorCategory, ErrorKind, KhefError, Result};
use crate::kdf::{SALT_LEN, Salt};

/// Marker identifying khef containers
pub const MAGIC: &[u8; 4] = b"KHEF";

/// Format version written by this implementation
pub const VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;

/// Size of a container holding an empty plaintext
pub const MIN_CONTAINER_LEN: usize = HEADER_LEN + TAG_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub salt: Salt,
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
    pub tag: Tag,
}

impl Container {
    /// Serialize into the on-disk byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_CONTAINER_LEN + self.ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse the on-disk layout. Never attempts decryption.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::FormatInvalid,
                "not a khef file",
            ));
        }

        let mut pos = MAGIC.len();
        match data.get(pos) {
            Some(&VERSION) => {}
            Some(other) => {
                return Err(KhefError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::UnsupportedVersion,
                    format!("khef format version {} is not supported", other),
                ));
            }
            None => return Err(truncated()),
        }
        pos += 1;

        if data.len() < MIN_CONTAINER_LEN {
            return Err(truncated());
        }

        let salt = Salt::from_slice(&data[pos..pos + SALT_LEN])?;
        pos += SALT_LEN;

        let nonce: Nonce = data[pos..pos + NONCE_LEN]
            .try_into()
            .map_err(|_| KhefError::invariant("nonce slice has the wrong length"))?;
        pos += NONCE_LEN;

        let tag_start = data.len() - TAG_LEN;
        let ciphertext = data[pos..tag_start].to_vec();
        let tag: Tag = data[tag_start..]
            .try_into()
            .map_err(|_| KhefError::invariant("tag slice has the wrong length"))?;

        Ok(Self {
            salt,
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn truncated() -> KhefError {
    KhefError::with_kind(
        ErrorCategory::User,
        ErrorKind::TruncatedInput,
        "not a khef file: input likely truncated",
    )
}
