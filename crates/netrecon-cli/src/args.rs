//! Command-line arguments (component 4.M).

use clap::Parser;
use netrecon_core::{Host, PortRange, Protocol, ScanOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netrecon", version, about = "Network host and service scanner")]
pub struct Args {
    /// Target IPv4/IPv6 addresses (literal, no DNS resolution)
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Ports to probe, e.g. "22,80,443" or "1-1024"
    #[arg(short, long, default_value = "22,80,443,8080")]
    pub ports: String,

    /// Query the Shodan index instead of sending packets
    #[arg(long)]
    pub passive: bool,

    /// Delegate to `nmap` instead of probing directly
    #[arg(long)]
    pub external: bool,

    /// Worker pool size
    #[arg(long, default_value_t = 100)]
    pub workers: usize,

    /// Directory containing the payload/CPE/CVE data files
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Fill alive/reason only; skip the banner-grab phase
    #[arg(long)]
    pub skip_banner_grab: bool,

    /// Skip the vulnerability lookup stage
    #[arg(long)]
    pub disable_vuln_lookup: bool,

    /// Shodan API key, required with --passive
    #[arg(long, env = "SHODAN_API_KEY")]
    pub shodan_api_key: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn to_scan_options(&self) -> ScanOptions {
        ScanOptions {
            passive: self.passive,
            external: self.external,
            workers: self.workers,
            data_dir: self.data_dir.clone(),
            skip_banner_grab: self.skip_banner_grab,
            disable_vuln_lookup: self.disable_vuln_lookup,
            shodan_api_key: self.shodan_api_key.clone(),
            ..ScanOptions::default()
        }
    }

    /// Build one [`Host`] per target, with a TCP service for every requested
    /// port plus a single ICMP ping entry.
    pub fn build_hosts(&self) -> netrecon_core::Result<Vec<Host>> {
        let ports = PortRange::parse(&self.ports)?.expand();
        Ok(self
            .targets
            .iter()
            .map(|addr| {
                let icmp_protocol = if addr.contains(':') {
                    Protocol::IcmpV6
                } else {
                    Protocol::Icmp
                };
                let mut hints: Vec<(Protocol, u16)> =
                    ports.iter().map(|&p| (Protocol::Tcp, p)).collect();
                hints.push((icmp_protocol, 0));
                Host::new(addr.clone(), &hints)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_hosts_creates_one_tcp_service_per_port_plus_icmp() {
        let args = Args {
            targets: vec!["10.0.0.1".to_string()],
            ports: "80,443".to_string(),
            passive: false,
            external: false,
            workers: 100,
            data_dir: PathBuf::from("./data"),
            skip_banner_grab: false,
            disable_vuln_lookup: false,
            shodan_api_key: None,
            verbose: false,
        };
        let hosts = args.build_hosts().unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].services.len(), 3);
        assert!(hosts[0]
            .services
            .iter()
            .any(|s| s.protocol == Protocol::Icmp && s.port == 0));
    }
}
