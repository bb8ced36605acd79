//! Host scanner family (component 4.D): dispatches a batch of hosts into an
//! active-internal, active-external (nmap), or passive (Shodan) strategy.

use crate::scanner_factory::{scan_many, ServiceScannerFactory};
use crate::{arp_scanner::ArpScanner, runner::CancelToken};
use netrecon_core::{Error, Host, Protocol, Result, ScanReason, Service};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::Value;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// `HostScannerFactory::get(passive, external)` selects one of the three strategies.
pub enum HostScanner<'a> {
    Internal(InternalHostScanner<'a>),
    Nmap(NmapScanner),
    Shodan(ShodanScanner),
}

pub struct HostScannerFactory;

impl HostScannerFactory {
    pub fn get(passive: bool, external: bool, factory: &ServiceScannerFactory) -> HostScanner<'_> {
        if passive {
            HostScanner::Shodan(ShodanScanner::new(String::new()))
        } else if external {
            HostScanner::Nmap(NmapScanner::default())
        } else {
            HostScanner::Internal(InternalHostScanner::new(factory))
        }
    }
}

/// Orchestrates component C directly: ARP pre-check for hosts inside a
/// locally attached subnet, then the protocol-dispatched service scanners.
pub struct InternalHostScanner<'a> {
    factory: &'a ServiceScannerFactory,
    workers: usize,
    arp_timeout: Duration,
}

impl<'a> InternalHostScanner<'a> {
    pub fn new(factory: &'a ServiceScannerFactory) -> Self {
        Self {
            factory,
            workers: 100,
            arp_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_arp_timeout(mut self, timeout: Duration) -> Self {
        self.arp_timeout = timeout;
        self
    }

    pub async fn scan(&self, hosts: &mut [Host], cancel: &CancelToken) {
        for host in hosts.iter_mut() {
            self.scan_host(host, cancel).await;
        }
    }

    async fn scan_host(&self, host: &mut Host, cancel: &CancelToken) {
        if let Ok(std::net::IpAddr::V4(v4)) = host.parse_address() {
            if ArpScanner::is_local(v4) {
                let arp_scanner = ArpScanner::new(self.arp_timeout);
                let mut probe = Service::new(host.address.clone(), Protocol::Tcp, 0);
                arp_scanner.scan_one(&mut probe).await;
                host.alive = probe.alive;
                if probe.alive {
                    host.reason = ScanReason::ReplyReceived;
                }
            }
        }

        scan_many(self.factory, &mut host.services, self.workers, cancel).await;

        if !host.alive {
            host.alive = host.services.iter().any(|s| s.alive);
            if host.alive {
                host.reason = ScanReason::ReplyReceived;
            } else if let Some(service) = host.services.first() {
                host.reason = service.reason;
            }
        }
    }
}

/// Spawns `nmap -Pn -sS -n -oX - --host-timeout 30s <ports> <addr>` and
/// parses its XML report. `process` is exposed separately so the XML-parsing
/// logic is unit-testable without executing the external tool.
#[derive(Debug, Default, Clone)]
pub struct NmapScanner {
    pub binary: Option<String>,
}

impl NmapScanner {
    pub fn get_version(&self) -> Result<String> {
        let binary = self.binary.as_deref().unwrap_or("nmap");
        let output = Command::new(binary)
            .arg("--version")
            .output()
            .map_err(Error::Io)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub fn scan(&self, hosts: &mut [Host]) -> Result<()> {
        let binary = self.binary.as_deref().unwrap_or("nmap");
        for host in hosts.iter_mut() {
            let ports: Vec<String> = host.services.iter().map(|s| s.port.to_string()).collect();
            let port_arg = format!("-p{}", ports.join(","));
            let output = Command::new(binary)
                .args(["-Pn", "-sS", "-n", "-oX", "-", "--host-timeout", "30s"])
                .arg(&port_arg)
                .arg(&host.address)
                .output()
                .map_err(Error::Io)?;
            let xml = String::from_utf8_lossy(&output.stdout);
            let parsed = Self::process(&xml)?;
            if let Some(parsed_host) = parsed.into_iter().next() {
                *host = parsed_host;
            }
        }
        Ok(())
    }

    /// Parse an `nmaprun` XML document into zero or more [`Host`] records.
    /// Exposed directly so this can be unit-tested against a literal XML
    /// sample without shelling out to `nmap`.
    pub fn process(xml: &str) -> Result<Vec<Host>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut hosts = Vec::new();
        let mut current: Option<Host> = None;
        let mut current_port: Option<(Protocol, u16)> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"address" => {
                        let addr = attr(&e, b"addr");
                        if let Some(addr) = addr {
                            if current.is_none() {
                                current = Some(Host::new(addr, &[]));
                            }
                        }
                    }
                    b"port" => {
                        let protocol = match attr(&e, b"protocol").as_deref() {
                            Some("udp") => Protocol::Udp,
                            _ => Protocol::Tcp,
                        };
                        let port: u16 = attr(&e, b"portid")
                            .and_then(|p| p.parse().ok())
                            .unwrap_or(0);
                        current_port = Some((protocol, port));
                    }
                    b"state" => {
                        if let (Some(host), Some((protocol, port))) = (current.as_mut(), current_port) {
                            let state = attr(&e, b"state").unwrap_or_default();
                            let mut service = Service::new(host.address.clone(), protocol, port);
                            if state == "open" {
                                service.set_outcome(ScanReason::ReplyReceived, Vec::new());
                            } else {
                                service.set_outcome(ScanReason::PortUnreachable, Vec::new());
                            }
                            host.services.push(service);
                        }
                    }
                    b"script" if attr(&e, b"id").as_deref() == Some("banner") => {
                        if let (Some(host), Some(output)) = (current.as_mut(), attr(&e, b"output")) {
                            if let Some(service) = host.services.last_mut() {
                                service.banner = output.into_bytes();
                                if service.reason == ScanReason::ReplyReceived {
                                    service.alive = true;
                                }
                            }
                        }
                    }
                    b"host" => {}
                    _ => {}
                },
                Ok(Event::End(e)) if e.name().as_ref() == b"host" => {
                    if let Some(host) = current.take() {
                        hosts.push(host);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(%e, "nmap xml parse error");
                    return Err(Error::Parse(format!("nmap xml: {e}")));
                }
            }
            buf.clear();
        }

        Ok(hosts)
    }
}

fn attr(e: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == name {
            Some(String::from_utf8_lossy(&a.value).to_string())
        } else {
            None
        }
    })
}

/// Queries the Shodan host index instead of sending packets.
#[derive(Debug, Clone)]
pub struct ShodanScanner {
    api_key: String,
}

impl ShodanScanner {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    pub fn scan(&self, hosts: &mut [Host]) -> Result<()> {
        let client = reqwest::blocking::Client::new();
        for host in hosts.iter_mut() {
            let url = format!(
                "https://api.shodan.io/shodan/host/{}?key={}",
                host.address, self.api_key
            );
            let body = client
                .get(&url)
                .send()
                .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
                .text()
                .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
            if let Some(parsed) = Self::process(&body)?.into_iter().next() {
                *host = parsed;
            }
        }
        Ok(())
    }

    /// Parse a Shodan `/shodan/host/<ip>` JSON document into a [`Host`],
    /// exposed for unit testing without making the HTTP call.
    pub fn process(json: &str) -> Result<Vec<Host>> {
        let value: Value = serde_json::from_str(json)?;
        let Some(ip) = value.get("ip_str").and_then(Value::as_str) else {
            return Ok(Vec::new());
        };

        let mut host = Host::new(ip, &[]);
        host.alive = true;
        host.reason = ScanReason::ReplyReceived;

        if let Some(entries) = value.get("data").and_then(Value::as_array) {
            for entry in entries {
                let port = entry.get("port").and_then(Value::as_u64).unwrap_or(0) as u16;
                let protocol = match entry.get("transport").and_then(Value::as_str) {
                    Some("udp") => Protocol::Udp,
                    _ => Protocol::Tcp,
                };
                let banner = entry
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .as_bytes()
                    .to_vec();

                let mut service = Service::new(host.address.clone(), protocol, port);
                service.set_outcome(ScanReason::ReplyReceived, banner);
                host.services.push(service);
            }
        }

        Ok(vec![host])
    }
}
