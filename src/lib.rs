//! khef - passphrase-based encryption of a single file
//!
//! scrypt derives a key from the passphrase and a per-file salt, and
//! XSalsa20Poly1305 seals the contents. All I/O goes through
//! `boundary::SystemBoundary` so the workflows can run against real files
//! or an in-memory fake.

#![forbid(unsafe_code)]

pub mod boundary;
pub mod cipher;
pub mod config;
pub mod container;
pub mod error;
pub mod info;
pub mod kdf;
pub mod passphrase;
pub mod workflow;
