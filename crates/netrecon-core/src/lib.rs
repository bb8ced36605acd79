//! Core types, error handling, configuration, and data loaders for netrecon.
//!
//! # Examples
//!
//! ```
//! use netrecon_core::{PortRange, ScanOptions};
//!
//! let ports = PortRange::parse("80,443,8080-8090").unwrap();
//! assert_eq!(ports.expand().len(), 13);
//!
//! let opts = ScanOptions::default();
//! assert_eq!(opts.workers, 100);
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod types;

pub use config::ScanOptions;
pub use error::{Error, Result};
pub use loader::{CpeDictionary, CveCatalog, DataCatalogs, PayloadCatalog, RegexCatalog};
pub use types::{
    CpeEntry, CveRecord, Host, OpSys, PortRange, Protocol, RegexFingerprint, ScanReason,
    Service, Severity,
};
