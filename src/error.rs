use std::error::Error as StdError;
use std::io;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee that the error was not caused by
    /// the user, merely that the code cannot tell.
    Internal,

    /// The user provided invalid input or asked for something that cannot
    /// be done.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input does not carry the khef magic marker.
    FormatInvalid,
    /// The input carries the khef marker but a format version we do not know.
    UnsupportedVersion,
    /// The input ended before a complete container could be read.
    TruncatedInput,
    /// Authentication failed due to an incorrect passphrase, tampering or
    /// corruption.
    AuthenticationFailed,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// The passphrase and its confirmation differ.
    PassphraseMismatch,
    /// The destination exists and replacing it was not requested.
    DestinationExists,
    /// Configuration could not be read, parsed or written.
    Config,
    /// Low-level scrypt key derivation failed.
    KdfFailure,
    /// The secretbox primitive refused to seal data.
    CipherFailure,
    /// Unexpected state reached within khef logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or the OS random
    /// source failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct KhefError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl KhefError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Shorthand for a violated internal invariant.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::Internal, ErrorKind::InternalInvariant, msg)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    /// True for every way a container can be structurally unusable.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self.kind,
            Some(ErrorKind::FormatInvalid)
                | Some(ErrorKind::UnsupportedVersion)
                | Some(ErrorKind::TruncatedInput)
        )
    }

    pub fn is_authentication_failure(&self) -> bool {
        self.kind == Some(ErrorKind::AuthenticationFailed)
    }

    /// Renders the message followed by every source in the chain.
    pub fn chain_display(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = StdError::source(self);
        while let Some(err) = next {
            out.push_str(": ");
            out.push_str(&err.to_string());
            next = err.source();
        }
        out
    }
}

/// Maps a failed read of `path` to an I/O error, treating a missing file as
/// the user's mistake.
pub(crate) fn read_error(path: &Path, err: io::Error) -> KhefError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    KhefError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KhefError>;
