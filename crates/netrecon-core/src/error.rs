//! Error types for netrecon core library

use std::io;
use std::net::AddrParseError;
use thiserror::Error;

/// Result type alias for netrecon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal (programmer-visible) errors.
///
/// Per-probe failures never surface here — they become a [`crate::types::ScanReason`]
/// on the affected [`crate::types::Service`]. `Error` is reserved for malformed
/// input and for the data loaders.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors with automatic conversion
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Parsing errors for addresses, CIDRs, CPE/CVE strings
    #[error("Parse error: {0}")]
    Parse(String),

    /// Permission/capability errors (raw sockets need elevated privileges)
    #[error("Insufficient privileges: {0}")]
    Privilege(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid target specification passed to the library entry point
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// A data file (payloads/cpe-list/cpe-regex/cpe-cves) is missing or corrupt
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<AddrParseError> for Error {
    fn from(err: AddrParseError) -> Self {
        Error::Parse(format!("invalid IP address: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("TOML parse error: {err}"))
    }
}
