//! Library options for a scan, mirroring the external interface's option table.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options accepted by the `netrecon::scan` entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Use the Shodan index instead of sending packets.
    pub passive: bool,
    /// Delegate to `nmap` instead of probing directly.
    pub external: bool,
    /// Worker pool size for the task queue runner.
    pub workers: usize,
    pub tcp_timeout_ms: u64,
    pub udp_timeout_ms: u64,
    pub icmp_timeout_ms: u64,
    pub arp_timeout_ms: u64,
    /// Deadline for the banner-grab read phase after a TCP connect succeeds.
    pub banner_timeout_ms: u64,
    /// Fill `alive`/`reason` only; skip the banner-grab phase entirely.
    pub skip_banner_grab: bool,
    /// Skip the vulnerability lookup stage (G).
    pub disable_vuln_lookup: bool,
    /// Directory containing `payloads`, `cpe-list`, `cpe-regex`, `cpe-cves`.
    pub data_dir: PathBuf,
    /// Shodan API key, required when `passive` is set.
    pub shodan_api_key: Option<String>,
    /// `nmap` binary name or path, defaulting to `"nmap"` on `$PATH`.
    pub nmap_binary: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            passive: false,
            external: false,
            workers: 100,
            tcp_timeout_ms: 3_000,
            udp_timeout_ms: 2_000,
            icmp_timeout_ms: 1_000,
            arp_timeout_ms: 1_000,
            banner_timeout_ms: 2_000,
            skip_banner_grab: false,
            disable_vuln_lookup: false,
            data_dir: PathBuf::from("./data"),
            shodan_api_key: None,
            nmap_binary: None,
        }
    }
}

impl ScanOptions {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be greater than 0".to_string()));
        }

        let needs_data_dir = !self.passive && !self.external;
        if needs_data_dir && !self.data_dir.is_dir() {
            return Err(Error::Config(format!(
                "data_dir {:?} does not exist",
                self.data_dir
            )));
        }

        if self.passive && self.shodan_api_key.is_none() {
            return Err(Error::Config(
                "passive scanning requires shodan_api_key".to_string(),
            ));
        }

        Ok(())
    }

    pub fn tcp_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tcp_timeout_ms)
    }

    pub fn udp_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.udp_timeout_ms)
    }

    pub fn icmp_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.icmp_timeout_ms)
    }

    pub fn arp_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.arp_timeout_ms)
    }

    pub fn banner_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.banner_timeout_ms)
    }
}
