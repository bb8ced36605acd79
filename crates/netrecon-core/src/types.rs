//! Core data model: hosts, services, and the identifiers attached to them
//! during banner analysis.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IANA protocol numbers used by the scanner family (IPPROTO_* equivalents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    IcmpV6,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::IcmpV6 => "icmpv6",
        };
        write!(f, "{s}")
    }
}

/// Machine-readable cause for a [`Service`]'s alive/dead verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanReason {
    #[default]
    NotScanned,
    InProgress,
    ReplyReceived,
    TimedOut,
    IcmpUnreachable,
    PortUnreachable,
    HostUnreachable,
    ScanFailed,
}

/// Guessed operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpSys {
    #[default]
    Unidentified,
    WindowsNt,
    Debian,
    Ubuntu,
    EnterpriseLinux,
    Fedora,
    OpenSuSe,
    FreeBsd,
    Other,
}

impl fmt::Display for OpSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpSys::Unidentified => "unidentified",
            OpSys::WindowsNt => "Windows NT",
            OpSys::Debian => "Debian",
            OpSys::Ubuntu => "Ubuntu",
            OpSys::EnterpriseLinux => "Enterprise Linux",
            OpSys::Fedora => "Fedora",
            OpSys::OpenSuSe => "openSUSE",
            OpSys::FreeBsd => "FreeBSD",
            OpSys::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// Severity bucket attached to a [`CveRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Severity::Low,
            1 => Severity::Medium,
            2 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

/// One vulnerability record from the local CVE catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveRecord {
    /// Identifier of the form `YYYY-NNNNN` (no `CVE-` prefix internally).
    pub cve: String,
    pub severity: Severity,
    pub cvss: Option<f32>,
}

/// One record from the CPE dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpeEntry {
    /// `a` (application), `o` (operating system), or `h` (hardware).
    pub part: char,
    pub vendor: String,
    pub product: String,
    pub version: Option<String>,
    pub title: Option<String>,
    /// Older versions of this product that should alias to this entry.
    pub prev_versions: Vec<String>,
}

impl CpeEntry {
    /// Render as `part:vendor:product[:version]`.
    pub fn to_cpe_string(&self) -> String {
        match &self.version {
            Some(v) => format!("{}:{}:{}:{}", self.part, self.vendor, self.product, v),
            None => format!("{}:{}:{}", self.part, self.vendor, self.product),
        }
    }

    /// True if `version` matches this entry's own version or one of its aliases.
    pub fn matches_version(&self, version: &str) -> bool {
        self.version.as_deref() == Some(version) || self.prev_versions.iter().any(|v| v == version)
    }
}

/// One compiled entry from the regex fingerprint catalog.
#[derive(Debug, Clone)]
pub struct RegexFingerprint {
    pub pattern: Regex,
    /// CPE template with `$1`, `$2`, ... placeholders for capture groups.
    pub cpe_template: String,
}

impl RegexFingerprint {
    pub fn new(pattern: &str, cpe_template: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self {
            pattern,
            cpe_template: cpe_template.to_string(),
        })
    }
}

/// One (host, protocol, port) probe target.
///
/// A `Service` is owned exclusively by its [`Host`]; `host_addr` is a copy of
/// the owning host's address rather than a pointer back to the `Host`, which
/// sidesteps the cyclic-ownership problem the original design solves with a
/// weak reference — a `Service` never needs to outlive the slice it lives in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub host_addr: String,
    pub protocol: Protocol,
    /// 0 for ICMP ping, else 1-65535.
    pub port: u16,
    pub alive: bool,
    pub reason: ScanReason,
    #[serde(with = "banner_as_lossy_string")]
    pub banner: Vec<u8>,
    pub cpe: Vec<String>,
    pub cve: Vec<CveRecord>,
}

mod banner_as_lossy_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(d)?.into_bytes())
    }
}

impl Service {
    pub fn new(host_addr: impl Into<String>, protocol: Protocol, port: u16) -> Self {
        Self {
            host_addr: host_addr.into(),
            protocol,
            port,
            alive: false,
            reason: ScanReason::NotScanned,
            banner: Vec::new(),
            cpe: Vec::new(),
            cve: Vec::new(),
        }
    }

    /// Record a terminal verdict, upholding the invariant
    /// `reason == ReplyReceived  <=>  alive == true`.
    pub fn set_outcome(&mut self, reason: ScanReason, banner: Vec<u8>) {
        self.alive = reason == ScanReason::ReplyReceived;
        self.reason = reason;
        self.banner = banner;
    }

    pub fn banner_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.banner)
    }
}

/// A single network endpoint by address, owning the [`Service`]s probed on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub alive: bool,
    pub reason: ScanReason,
    pub services: Vec<Service>,
    pub op_sys: OpSys,
    pub os_ver: Option<f64>,
}

impl Host {
    /// Create a host with one not-yet-scanned [`Service`] per `(protocol, port)` hint.
    pub fn new(address: impl Into<String>, ports: &[(Protocol, u16)]) -> Self {
        let address = address.into();
        let services = ports
            .iter()
            .map(|(proto, port)| Service::new(address.clone(), *proto, *port))
            .collect();
        Self {
            address,
            alive: false,
            reason: ScanReason::NotScanned,
            services,
            op_sys: OpSys::Unidentified,
            os_ver: None,
        }
    }

    pub fn parse_address(&self) -> Result<std::net::IpAddr> {
        self.address
            .parse()
            .map_err(|_| Error::InvalidTarget(self.address.clone()))
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.parse_address(), Ok(std::net::IpAddr::V6(_)))
    }
}

/// Port specification parsed from a CLI-style string: `"80", "1-1000", "80,443,8080-8090"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortRange {
    Single(u16),
    Range(u16, u16),
    List(Vec<PortRange>),
}

impl PortRange {
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::Parse("empty port specification".to_string()));
        }

        if input.contains(',') {
            let parts: Result<Vec<PortRange>> =
                input.split(',').map(|s| PortRange::parse(s.trim())).collect();
            return Ok(PortRange::List(parts?));
        }

        if let Some((start, end)) = input.split_once('-') {
            let start: u16 = start
                .trim()
                .parse()
                .map_err(|_| Error::Parse(format!("invalid port: {start}")))?;
            let end: u16 = end
                .trim()
                .parse()
                .map_err(|_| Error::Parse(format!("invalid port: {end}")))?;
            if start > end {
                return Err(Error::Parse(format!("range start {start} exceeds end {end}")));
            }
            return Ok(PortRange::Range(start, end));
        }

        let port: u16 = input
            .parse()
            .map_err(|_| Error::Parse(format!("invalid port: {input}")))?;
        Ok(PortRange::Single(port))
    }

    /// Flatten into an ordered, deduplicated list of ports.
    pub fn expand(&self) -> Vec<u16> {
        let mut ports = Vec::new();
        self.collect_into(&mut ports);
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    fn collect_into(&self, out: &mut Vec<u16>) {
        match self {
            PortRange::Single(p) => out.push(*p),
            PortRange::Range(a, b) => out.extend(*a..=*b),
            PortRange::List(list) => list.iter().for_each(|p| p.collect_into(out)),
        }
    }
}
