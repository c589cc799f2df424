//! Everything that touches the outside world
//!
//! Workflows never call the filesystem, the OS random source or the
//! terminal directly. They go through a `SystemBoundary`, so tests can swap
//! in `MemoryBoundary` and run without real files or real randomness.

mod memory;
mod os;

pub use memory::MemoryBoundary;
pub use os::OsBoundary;

use std::path::Path;

use zeroize::Zeroizing;

use crate::error::Result;

/// How an atomic write treats an existing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `ErrorKind::DestinationExists` if the path exists.
    CreateNew,
    /// Replace whatever is at the path.
    Replace,
}

pub trait SystemBoundary {
    /// Whether something is already at `path`. Only a hint for failing
    /// early; `write_file_atomic` with `CreateNew` is the real check.
    fn exists(&self, path: &Path) -> bool;

    /// Read the whole file at `path`.
    fn read_file(&mut self, path: &Path) -> Result<Vec<u8>>;

    /// Write `contents` to `path` so that readers only ever observe the old
    /// state or the complete new file.
    fn write_file_atomic(&mut self, path: &Path, contents: &[u8], mode: WriteMode) -> Result<()>;

    /// Fill `buf` from a cryptographically secure source.
    fn fill_random(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Obtain the passphrase without echoing it.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}
