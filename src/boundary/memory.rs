use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zeroize::Zeroizing;

use super::{SystemBoundary, WriteMode};
use crate::error::{ErrorCategory, ErrorKind, KhefError, Result, read_error};

/// In-memory stand-in for the outside world.
///
/// Files live in a map, "random" bytes come from a seeded `StdRng`, and passphrases are served from a queue. Writes can be made to
/// fail part way through; a failed write never touches the visible files.
///
/// Not cryptographically secure. For tests only.
pub struct MemoryBoundary {
    files: BTreeMap<PathBuf, Vec<u8>>,
    passphrases: VecDeque<Zeroizing<Vec<u8>>>,
    rng: StdRng,
    fail_write_after: Option<usize>,
    passphrase_requests: usize,
    aborted_writes: usize,
}

impl Default for MemoryBoundary {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl MemoryBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            files: BTreeMap::new(),
            passphrases: VecDeque::new(),
            rng: StdRng::seed_from_u64(seed),
            fail_write_after: None,
            passphrase_requests: 0,
            aborted_writes: 0,
        }
    }

    pub fn insert_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(Vec::as_slice)
    }

    /// Queue a passphrase for the next `read_passphrase` call.
    pub fn push_passphrase(&mut self, passphrase: &[u8]) {
        self.passphrases.push_back(Zeroizing::new(passphrase.to_vec()));
    }

    /// Make the next write fail after `staged` bytes have been written to
    /// the staging area.
    pub fn fail_next_write_after(&mut self, staged: usize) {
        self.fail_write_after = Some(staged);
    }

    pub fn passphrase_requests(&self) -> usize {
        self.passphrase_requests
    }

    pub fn aborted_writes(&self) -> usize {
        self.aborted_writes
    }
}

impl SystemBoundary for MemoryBoundary {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_file(&mut self, path: &Path) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            read_error(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such file in memory"),
            )
        })
    }

    fn write_file_atomic(&mut self, path: &Path, contents: &[u8], mode: WriteMode) -> Result<()> {
        if mode == WriteMode::CreateNew && self.files.contains_key(path) {
            return Err(KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::DestinationExists,
                format!("{} already exists", path.display()),
            ));
        }

        let mut staged = Vec::with_capacity(contents.len());
        if let Some(limit) = self.fail_write_after.take() {
            staged.extend_from_slice(&contents[..limit.min(contents.len())]);
            self.aborted_writes += 1;
            return Err(KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to write to tempfile",
                io::Error::other(format!("injected failure after {} bytes", staged.len())),
            ));
        }
        staged.extend_from_slice(contents);
        self.files.insert(path.to_path_buf(), staged);
        Ok(())
    }

    fn fill_random(&mut self, buf: &mut [u8]) -> Result<()> {
        self.rng.fill_bytes(buf);
        Ok(())
    }

    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        self.passphrase_requests += 1;
        self.passphrases.pop_front().ok_or_else(|| {
            KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "no passphrase queued",
            )
        })
    }
}
