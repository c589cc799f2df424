//! File encryption/decryption workflows
//!
//! Each workflow borrows a `SystemBoundary` for the duration of one call and
//! is otherwise pure: key material and passphrases live only inside `run`
//! and are wiped on every exit path.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::boundary::{SystemBoundary, WriteMode};
use crate::cipher::{self, NONCE_LEN, Nonce};
use crate::container::Container;
use crate::error::{ErrorCategory, ErrorKind, KhefError, Result};
use crate::kdf::{self, KdfParams, SALT_LEN, Salt};

/// Encrypt `plaintext` under `passphrase` with the given salt and nonce.
///
/// Callers other than tests must use fresh random values for both; see
/// `encrypt_bytes`.
pub fn seal_container(
    passphrase: &[u8],
    plaintext: &[u8],
    salt: Salt,
    nonce: Nonce,
    params: &KdfParams,
) -> Result<Container> {
    let key = kdf::derive(passphrase, &salt, params)?;
    let (ciphertext, tag) = cipher::seal(&key, &nonce, plaintext)?;
    Ok(Container {
        salt,
        nonce,
        ciphertext,
        tag,
    })
}

/// Encrypt `plaintext` with a fresh salt and nonce drawn from `boundary`,
/// returning the encoded container.
pub fn encrypt_bytes<B: SystemBoundary>(
    boundary: &mut B,
    passphrase: &[u8],
    plaintext: &[u8],
    params: &KdfParams,
) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    boundary.fill_random(&mut salt)?;
    let mut nonce = [0u8; NONCE_LEN];
    boundary.fill_random(&mut nonce)?;

    let container = seal_container(passphrase, plaintext, Salt::new(salt), nonce, params)?;
    Ok(container.encode())
}

/// Authenticate and decrypt an already decoded container.
pub fn open_container(
    passphrase: &[u8],
    container: &Container,
    params: &KdfParams,
) -> Result<Zeroizing<Vec<u8>>> {
    let key = kdf::derive(passphrase, &container.salt, params)?;
    cipher::open(&key, &container.nonce, &container.ciphertext, &container.tag)
}

/// Decode and decrypt `data`. Format problems are reported before any key
/// derivation takes place.
pub fn decrypt_bytes(
    passphrase: &[u8],
    data: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<Vec<u8>>> {
    let container = Container::decode(data)?;
    open_container(passphrase, &container, params)
}

fn rejected(path: &Path, err: KhefError) -> KhefError {
    warn!(path = %path.display(), kind = ?err.kind, "container rejected");
    err.with_context(format!("cannot decrypt {}", path.display()))
}

/// Fail before prompting and running scrypt when the write is going to be
/// refused anyway.
fn refuse_existing<B: SystemBoundary>(
    boundary: &B,
    destination: &Path,
    mode: WriteMode,
) -> Result<()> {
    if mode == WriteMode::CreateNew && boundary.exists(destination) {
        return Err(KhefError::with_kind(
            ErrorCategory::User,
            ErrorKind::DestinationExists,
            format!("{} already exists", destination.display()),
        ));
    }
    Ok(())
}

/// ReadPlaintext → ReadPassphrase → GenerateSalt → GenerateNonce →
/// DeriveKey → Seal → Encode → WriteOutput
pub struct EncryptionWorkflow<'a, B: SystemBoundary> {
    boundary: &'a mut B,
    params: KdfParams,
    mode: WriteMode,
}

impl<'a, B: SystemBoundary> EncryptionWorkflow<'a, B> {
    pub fn new(boundary: &'a mut B) -> Self {
        Self {
            boundary,
            params: KdfParams::default(),
            mode: WriteMode::CreateNew,
        }
    }

    pub fn kdf_params(mut self, params: KdfParams) -> Self {
        self.params = params;
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn run(self, source: &Path, destination: &Path) -> Result<()> {
        let plaintext = Zeroizing::new(self.boundary.read_file(source)?);
        refuse_existing(&*self.boundary, destination, self.mode)?;
        let passphrase = self.boundary.read_passphrase()?;
        debug!(bytes = plaintext.len(), "deriving key and sealing");

        let encoded = encrypt_bytes(&mut *self.boundary, &passphrase, &plaintext, &self.params)
            .map_err(|e| e.with_context("encryption failed"))?;
        self.boundary
            .write_file_atomic(destination, &encoded, self.mode)
            .map_err(|e| e.with_context(format!("failed to write to {}", destination.display())))?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            bytes = plaintext.len(),
            "encrypted"
        );
        Ok(())
    }
}

/// ReadContainer → Decode → ReadPassphrase → DeriveKey → Open → WriteOutput,
/// with Decode and Open able to reject. A rejected container writes nothing.
pub struct DecryptionWorkflow<'a, B: SystemBoundary> {
    boundary: &'a mut B,
    params: KdfParams,
    mode: WriteMode,
}

impl<'a, B: SystemBoundary> DecryptionWorkflow<'a, B> {
    pub fn new(boundary: &'a mut B) -> Self {
        Self {
            boundary,
            params: KdfParams::default(),
            mode: WriteMode::CreateNew,
        }
    }

    pub fn kdf_params(mut self, params: KdfParams) -> Self {
        self.params = params;
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn run(self, source: &Path, destination: &Path) -> Result<()> {
        let data = self.boundary.read_file(source)?;
        let container = Container::decode(&data).map_err(|e| rejected(source, e))?;
        refuse_existing(&*self.boundary, destination, self.mode)?;
        let passphrase = self.boundary.read_passphrase()?;
        debug!(bytes = container.ciphertext.len(), "deriving key and opening");

        let plaintext = open_container(&passphrase, &container, &self.params)
            .map_err(|e| rejected(source, e))?;
        self.boundary
            .write_file_atomic(destination, &plaintext, self.mode)
            .map_err(|e| e.with_context(format!("failed to write to {}", destination.display())))?;

        info!(
            source = %source.display(),
            destination = %destination.display(),
            bytes = plaintext.len(),
            "decrypted"
        );
        Ok(())
    }
}

/// Re-encrypt new plaintext into an existing container, checking first
/// that the passphrase opens the current contents so it cannot change by
/// accident.
pub struct UpdateWorkflow<'a, B: SystemBoundary> {
    boundary: &'a mut B,
    params: KdfParams,
}

impl<'a, B: SystemBoundary> UpdateWorkflow<'a, B> {
    pub fn new(boundary: &'a mut B) -> Self {
        Self {
            boundary,
            params: KdfParams::default(),
        }
    }

    pub fn kdf_params(mut self, params: KdfParams) -> Self {
        self.params = params;
        self
    }

    pub fn run(self, plain_path: &Path, container_path: &Path) -> Result<()> {
        let data = self.boundary.read_file(container_path)?;
        let container = Container::decode(&data).map_err(|e| rejected(container_path, e))?;
        let passphrase = self.boundary.read_passphrase()?;

        // Only the authentication result matters here.
        open_container(&passphrase, &container, &self.params)
            .map_err(|e| rejected(container_path, e))?;

        let plaintext = Zeroizing::new(self.boundary.read_file(plain_path)?);
        let encoded = encrypt_bytes(&mut *self.boundary, &passphrase, &plaintext, &self.params)
            .map_err(|e| e.with_context("encryption failed"))?;
        self.boundary
            .write_file_atomic(container_path, &encoded, WriteMode::Replace)
            .map_err(|e| {
                e.with_context(format!("failed to write to {}", container_path.display()))
            })?;

        info!(
            source = %plain_path.display(),
            container = %container_path.display(),
            bytes = plaintext.len(),
            "updated"
        );
        Ok(())
    }
}

/// `notes.txt` → `notes.txt.khef`
pub fn default_encrypt_destination(source: &Path, extension: &str) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// `notes.txt.khef` → `notes.txt`. Anything without the extension needs an
/// explicit destination.
pub fn default_decrypt_destination(source: &Path, extension: &str) -> Result<PathBuf> {
    let suffix = format!(".{}", extension);
    let stem = source
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(&suffix))
        .filter(|stem| !stem.is_empty());
    if let Some(stem) = stem {
        return Ok(source.with_file_name(stem));
    }
    Err(KhefError::with_kind(
        ErrorCategory::User,
        ErrorKind::Io,
        format!(
            "{} does not end in .{}; give a destination path explicitly",
            source.display(),
            extension
        ),
    ))
}
