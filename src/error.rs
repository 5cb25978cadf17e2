//! Domain error type shared by every module in this crate.
//!
//! All fallible entry points return [`Result<T>`], a type alias over
//! [`Error`]. Every failure mode the core can produce (partial CA state,
//! duplicate certs, malformed CSRs, crypto and I/O failures, config
//! parsing) gets its own variant so callers at the HTTP boundary can match
//! on it rather than parsing messages.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Backing error for all CA operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Some but not all required CA (or master) artifact paths exist.
    #[error("partial CA state: found {found:?}, missing {missing:?}")]
    PartialState {
        found: Vec<PathBuf>,
        missing: Vec<PathBuf>,
    },

    /// A cert or CSR already exists for `subject` and duplicates are disallowed.
    #[error("duplicate cert policy violation for '{subject}': {situation}")]
    DuplicateCert { subject: String, situation: String },

    /// CSR bytes failed PEM/DER parsing.
    #[error("malformed CSR for '{subject}': {reason}")]
    MalformedCsr { subject: String, reason: String },

    /// Key generation, signing, or CRL generation failed.
    #[error("crypto operation failed: {0}")]
    CryptoFailure(String),

    /// Any filesystem or process-launch failure.
    #[error("I/O failure at '{path}': {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The on-disk TOML configuration could not be parsed.
    #[error("failed to load config from '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// A subject name contained a path separator or NUL and was refused.
    #[error("invalid subject name '{0}'")]
    InvalidSubject(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn crypto(msg: impl std::fmt::Display) -> Self {
        Error::CryptoFailure(msg.to_string())
    }
}
