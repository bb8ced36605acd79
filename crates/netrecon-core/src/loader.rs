//! Readers for the gzip-compressed, length-prefixed binary data files:
//! `payloads`, `cpe-list`, `cpe-regex`, `cpe-cves`.
//!
//! Layout (spec ยง6): `gzip(<varint record count> <records...>)`, each record
//! a sequence of varint-length-prefixed fields. Thread-safe and read-only
//! once loaded — every loader returns a plain owned value, never a handle
//! back into the file.

use crate::error::{Error, Result};
use crate::types::{CpeEntry, CveRecord, RegexFingerprint, Severity};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// A cursor over a decompressed data file, handing out varint-prefixed fields.
struct RecordReader {
    buf: Vec<u8>,
    pos: usize,
}

impl RecordReader {
    fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::DataLoad(format!("{}: {e}", path.display())))?;
        let mut buf = Vec::new();
        GzDecoder::new(file)
            .read_to_end(&mut buf)
            .map_err(|e| Error::DataLoad(format!("{}: corrupt gzip stream: {e}", path.display())))?;
        Ok(Self { buf, pos: 0 })
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| Error::DataLoad("truncated varint".to_string()))?;
            self.pos += 1;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::DataLoad("varint too long".to_string()));
            }
        }
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| Error::DataLoad("field length exceeds file size".to_string()))?;
        let bytes = self.buf[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn read_string(&mut self) -> Result<String> {
        String::from_utf8(self.read_bytes()?)
            .map_err(|e| Error::DataLoad(format!("invalid UTF-8 field: {e}")))
    }

    fn read_optional_string(&mut self) -> Result<Option<String>> {
        let s = self.read_string()?;
        Ok(if s.is_empty() { None } else { Some(s) })
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_varint()? as u8)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_varint()? as u16)
    }
}

/// `port -> payloads` map loaded from the `payloads` file. Port `0` holds the
/// generic probe set sent when a destination port has no dedicated entry.
#[derive(Debug, Default, Clone)]
pub struct PayloadCatalog {
    by_port: HashMap<u16, Vec<Vec<u8>>>,
}

impl PayloadCatalog {
    /// Build a catalogue directly from a port-to-payloads map (used by scanner tests).
    pub fn from_map(by_port: HashMap<u16, Vec<Vec<u8>>>) -> Self {
        Self { by_port }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = RecordReader::open(path)?;
        let count = reader.read_varint()?;
        let mut by_port: HashMap<u16, Vec<Vec<u8>>> = HashMap::new();
        for _ in 0..count {
            let port = reader.read_u16()?;
            let payload = reader.read_bytes()?;
            by_port.entry(port).or_default().push(payload);
        }
        Ok(Self { by_port })
    }

    /// Payloads to send for `port`, falling back to the generic (port 0) set.
    pub fn payloads_for(&self, port: u16) -> &[Vec<u8>] {
        self.by_port
            .get(&port)
            .or_else(|| self.by_port.get(&0))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// CPE dictionary loaded from the `cpe-list` file.
#[derive(Debug, Default, Clone)]
pub struct CpeDictionary {
    pub entries: Vec<CpeEntry>,
}

impl CpeDictionary {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = RecordReader::open(path)?;
        let count = reader.read_varint()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let part = reader.read_u8()? as char;
            let vendor = reader.read_string()?;
            let product = reader.read_string()?;
            let version = reader.read_optional_string()?;
            let title = reader.read_optional_string()?;
            let prev_count = reader.read_varint()?;
            let mut prev_versions = Vec::with_capacity(prev_count as usize);
            for _ in 0..prev_count {
                prev_versions.push(reader.read_string()?);
            }
            entries.push(CpeEntry {
                part,
                vendor,
                product,
                version,
                title,
                prev_versions,
            });
        }
        Ok(Self { entries })
    }
}

/// Regex fingerprint catalog loaded from the `cpe-regex` file.
#[derive(Debug, Default, Clone)]
pub struct RegexCatalog {
    pub entries: Vec<RegexFingerprint>,
}

impl RegexCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = RecordReader::open(path)?;
        let count = reader.read_varint()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let pattern = reader.read_string()?;
            let cpe_template = reader.read_string()?;
            entries.push(
                RegexFingerprint::new(&pattern, &cpe_template)
                    .map_err(|e| Error::DataLoad(format!("bad regex `{pattern}`: {e}")))?,
            );
        }
        Ok(Self { entries })
    }
}

/// CVE catalog loaded from the `cpe-cves` file, inverted on CPE prefix.
#[derive(Debug, Default, Clone)]
pub struct CveCatalog {
    by_prefix: HashMap<String, Vec<CveRecord>>,
}

impl CveCatalog {
    /// Build a catalogue directly from a prefix-to-records map (used by scanner tests).
    pub fn from_map(by_prefix: HashMap<String, Vec<CveRecord>>) -> Self {
        Self { by_prefix }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = RecordReader::open(path)?;
        let count = reader.read_varint()?;
        let mut by_prefix: HashMap<String, Vec<CveRecord>> = HashMap::new();
        for _ in 0..count {
            let cpe_prefix = reader.read_string()?;
            let cve_id = reader.read_string()?;
            let severity = Severity::from_byte(reader.read_u8()?);
            by_prefix.entry(cpe_prefix).or_default().push(CveRecord {
                cve: cve_id,
                severity,
                cvss: None,
            });
        }
        Ok(Self { by_prefix })
    }

    pub fn entries_for_prefix(&self, prefix: &str) -> &[CveRecord] {
        self.by_prefix.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.by_prefix.keys().map(String::as_str)
    }
}

/// All four data files, loaded once at process start and shared read-only.
#[derive(Debug, Default, Clone)]
pub struct DataCatalogs {
    pub payloads: PayloadCatalog,
    pub cpe_dictionary: CpeDictionary,
    pub regex_catalog: RegexCatalog,
    pub cve_catalog: CveCatalog,
}

impl DataCatalogs {
    pub fn load(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            payloads: PayloadCatalog::load(&data_dir.join("payloads"))?,
            cpe_dictionary: CpeDictionary::load(&data_dir.join("cpe-list"))?,
            regex_catalog: RegexCatalog::load(&data_dir.join("cpe-regex"))?,
            cve_catalog: CveCatalog::load(&data_dir.join("cpe-cves"))?,
        })
    }
}
