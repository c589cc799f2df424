//! Authenticated encryption using NaCl secretbox (XSalsa20Poly1305)
//!
//! The box is used in detached mode: the ciphertext has exactly the length
//! of the plaintext and the 16-byte Poly1305 tag travels separately.

use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::{Nonce as BoxNonce, XSalsa20Poly1305};
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, KhefError, Result};
use crate::kdf::DerivedKey;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 tag in bytes
pub const TAG_LEN: usize = 16;

pub type Nonce = [u8; NONCE_LEN];
pub type Tag = [u8; TAG_LEN];

fn cipher_for(key: &DerivedKey) -> Result<XSalsa20Poly1305> {
    XSalsa20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|_| KhefError::invariant("derived key has the wrong length for secretbox"))
}

/// Encrypt `plaintext`, returning the ciphertext and its tag.
pub fn seal(key: &DerivedKey, nonce: &Nonce, plaintext: &[u8]) -> Result<(Vec<u8>, Tag)> {
    let cipher = cipher_for(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&BoxNonce::from(*nonce), b"", &mut buffer)
        .map_err(|_| {
            KhefError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::CipherFailure,
                "secretbox encryption failed",
            )
        })?;

    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(tag.as_slice());
    Ok((buffer, out))
}

/// Verify `tag` and decrypt `ciphertext`.
///
/// Fails closed: on a tag mismatch no plaintext bytes are returned and the
/// working buffer is wiped.
pub fn open(
    key: &DerivedKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    tag: &Tag,
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = cipher_for(key)?;
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    let tag = crypto_secretbox::aead::Tag::<XSalsa20Poly1305>::clone_from_slice(tag);
    cipher
        .decrypt_in_place_detached(&BoxNonce::from(*nonce), b"", &mut buffer[..], &tag)
        .map_err(|_| {
            KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "wrong passphrase or corrupted/tampered file",
            )
        })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{self, KdfParams, SALT_LEN, Salt};

    fn key(passphrase: &[u8]) -> DerivedKey {
        kdf::derive(
            passphrase,
            &Salt::new([9u8; SALT_LEN]),
            &KdfParams::insecure_fast(),
        )
        .unwrap()
    }

    #[test]
    fn test_seal_open() {
        let k = key(b"test");
        let nonce = [2u8; NONCE_LEN];
        let (ct, tag) = seal(&k, &nonce, b"hello world").unwrap();
        assert_eq!(ct.len(), b"hello world".len());
        assert_ne!(&ct[..], b"hello world");

        let pt = open(&k, &nonce, &ct, &tag).unwrap();
        assert_eq!(&pt[..], b"hello world");
    }

    #[test]
    fn test_empty_plaintext() {
        let k = key(b"test");
        let nonce = [0u8; NONCE_LEN];
        let (ct, tag) = seal(&k, &nonce, b"").unwrap();
        assert!(ct.is_empty());
        assert!(open(&k, &nonce, &ct, &tag).unwrap().is_empty());
    }

    #[test]
    fn test_tampered_tag() {
        let k = key(b"test");
        let nonce = [2u8; NONCE_LEN];
        let (ct, mut tag) = seal(&k, &nonce, b"payload").unwrap();
        tag[0] ^= 0x01;
        let err = open(&k, &nonce, &ct, &tag).expect_err("tampered tag accepted");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let k = key(b"test");
        let nonce = [2u8; NONCE_LEN];
        let (mut ct, tag) = seal(&k, &nonce, b"payload").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x80;
        let err = open(&k, &nonce, &ct, &tag).expect_err("tampered ciphertext accepted");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_wrong_nonce() {
        let k = key(b"test");
        let (ct, tag) = seal(&k, &[2u8; NONCE_LEN], b"payload").unwrap();
        let err = open(&k, &[3u8; NONCE_LEN], &ct, &tag).expect_err("wrong nonce accepted");
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_wrong_key() {
        let nonce = [2u8; NONCE_LEN];
        let (ct, tag) = seal(&key(b"correct horse"), &nonce, b"payload").unwrap();
        let err = open(&key(b"wrong horse"), &nonce, &ct, &tag).expect_err("wrong key accepted");
        assert!(err.is_authentication_failure());
    }

    #[test]
    fn test_nonce_changes_ciphertext() {
        let k = key(b"test");
        let (ct1, tag1) = seal(&k, &[1u8; NONCE_LEN], b"same plaintext").unwrap();
        let (ct2, tag2) = seal(&k, &[2u8; NONCE_LEN], b"same plaintext").unwrap();
        assert_ne!(ct1, ct2);
        assert_ne!(tag1, tag2);
    }
}
