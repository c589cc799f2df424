use std::fs;
use std::io::{self, Write};
use std::path::Path;

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;
use zeroize::Zeroizing;

use super::{SystemBoundary, WriteMode};
use crate::error::{ErrorCategory, ErrorKind, KhefError, Result, read_error};
use crate::passphrase::PassphraseReader;

/// The production boundary: real files, the OS random source, and a
/// passphrase reader chosen by the caller.
pub struct OsBoundary {
    passphrase_reader: Box<dyn PassphraseReader>,
}

impl OsBoundary {
    pub fn new(passphrase_reader: Box<dyn PassphraseReader>) -> Self {
        Self { passphrase_reader }
    }
}

impl SystemBoundary for OsBoundary {
    fn exists(&self, path: &Path) -> bool {
        // A dangling symlink still blocks a no-clobber rename.
        fs::symlink_metadata(path).is_ok()
    }

    fn read_file(&mut self, path: &Path) -> Result<Vec<u8>> {
        let data = fs::read(path).map_err(|e| read_error(path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "read file");
        Ok(data)
    }

    /// Tempfile in the destination directory, fsync, then rename.
    ///
    /// The tempfile is removed when dropped, so any failure before the
    /// rename leaves nothing behind.
    fn write_file_atomic(&mut self, path: &Path, contents: &[u8], mode: WriteMode) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp_file = tempfile::Builder::new()
            .prefix(".khef-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| {
                KhefError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to create tempfile in {}", dir.display()),
                    e,
                )
            })?;

        temp_file
            .write_all(contents)
            .map_err(|e| internal_io("failed to write to tempfile", e))?;
        // Flush and fsync() such that the rename later, if it succeeds, will
        // always point to a valid file.
        temp_file
            .flush()
            .map_err(|e| internal_io("failed to flush tempfile", e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| internal_io("failed to sync file prior to rename", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp_file
                .as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| internal_io("failed to set tempfile permissions", e))?;
        }

        let persisted = match mode {
            WriteMode::CreateNew => temp_file.persist_noclobber(path),
            WriteMode::Replace => temp_file.persist(path),
        };
        persisted.map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                KhefError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::DestinationExists,
                    format!("{} already exists", path.display()),
                    e.error,
                )
            } else {
                KhefError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to rename to target file {}", path.display()),
                    e.error,
                )
            }
        })?;

        debug!(path = %path.display(), bytes = contents.len(), ?mode, "wrote file");
        Ok(())
    }

    fn fill_random(&mut self, buf: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "operating system random source failed",
                e,
            )
        })
    }

    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        self.passphrase_reader.read_passphrase()
    }
}

fn internal_io(msg: &str, err: io::Error) -> KhefError {
    KhefError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}
