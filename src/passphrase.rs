//! Passphrase reading functionality

use crate::error::{ErrorCategory, ErrorKind, KhefError, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for reading passphrases from various sources
pub trait PassphraseReader {
    /// Read a passphrase as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the passphrase wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Hands out the same passphrase on every call.
#[cfg(test)]
pub(crate) struct ConstantPassphraseReader(Zeroizing<Vec<u8>>);

#[cfg(test)]
impl ConstantPassphraseReader {
    pub(crate) fn new(passphrase: Vec<u8>) -> Self {
        Self(Zeroizing::new(passphrase))
    }
}

#[cfg(test)]
impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.0.clone())
    }
}

/// Takes everything up to EOF, trailing newline included, as the passphrase.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "error reading passphrase",
                e,
            )
        })?;
        Ok(data)
    }
}

/// Reads passphrase from terminal with no echo
pub struct TerminalPassphraseReader {
    confirm: bool,
}

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self { confirm: false }
    }

    /// Ask twice and require both entries to match. Used when encrypting,
    /// where a typo would lock the data away.
    pub fn with_confirmation() -> Self {
        Self { confirm: true }
    }

    fn prompt(&self, prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
        io::stderr().write_all(prompt.as_bytes()).map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read *without echo*. rpassword hands back a String, which we move
        // straight into a zeroizing buffer.
        let passphrase = rpassword::read_password().map_err(|e| {
            KhefError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read passphrase from terminal.
    ///
    /// Terminal input is limited to UTF-8 by rpassword. For non-UTF-8
    /// passphrases, use --passphrase-stdin instead.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(KhefError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let passphrase = self.prompt("Passphrase (khef): ")?;
        if self.confirm {
            let again = self.prompt("Confirm passphrase (khef): ")?;
            if *passphrase != *again {
                return Err(KhefError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::PassphraseMismatch,
                    "passphrases do not match",
                ));
            }
        }
        Ok(passphrase)
    }
}
