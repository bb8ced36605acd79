//! Service/host scanner family, banner analysis, and vulnerability lookup.
//!
//! [`scan`] is the library's single entry point: select a host-scanning
//! strategy (internal/nmap/Shodan) per [`ScanOptions`], drive every host's
//! services through it, then run the banner-analysis pipeline
//! (tokenize -> match -> vulnerability lookup -> OS identify) strictly after
//! that host's probes have all completed.

pub mod arp_scanner;
pub mod host_scanner;
pub mod icmp_scanner;
pub mod matcher;
pub mod os_identify;
pub mod runner;
pub mod scanner_factory;
pub mod tcp_scanner;
pub mod tokenizer;
pub mod udp_scanner;
pub mod vuln_lookup;

pub use host_scanner::{HostScanner, HostScannerFactory, InternalHostScanner, NmapScanner, ShodanScanner};
pub use os_identify::{AutoIdentifier, OsIdentifier};
pub use runner::CancelToken;
pub use scanner_factory::{ServiceScanner, ServiceScannerFactory};
pub use tokenizer::{AutoTokenizer, Tokenizer};

use matcher::{AutoMatcher, Matcher};
use netrecon_core::{DataCatalogs, Host, Result, ScanOptions};
use std::sync::Arc;

/// Scan every host in `hosts` in place per `options`.
///
/// Non-passive, non-external runs load [`DataCatalogs`] from
/// `options.data_dir` once and share them (`Arc`) across every host; the
/// passive/external strategies don't touch the catalogues for liveness but
/// still run the analysis pipeline against whatever banners they return.
pub async fn scan(hosts: &mut [Host], options: &ScanOptions) -> Result<()> {
    options.validate()?;

    let catalogs = if options.passive || options.external {
        Arc::new(DataCatalogs::default())
    } else {
        Arc::new(DataCatalogs::load(&options.data_dir)?)
    };

    let cancel = CancelToken::new();

    if options.passive {
        let api_key = options.shodan_api_key.clone().unwrap_or_default();
        let shodan = ShodanScanner::new(api_key);
        shodan.scan(hosts)?;
    } else if options.external {
        let nmap = NmapScanner {
            binary: options.nmap_binary.clone(),
        };
        nmap.scan(hosts)?;
    } else {
        let factory = ServiceScannerFactory {
            tcp_timeout: options.tcp_timeout(),
            udp_timeout: options.udp_timeout(),
            icmp_timeout: options.icmp_timeout(),
            payloads: Arc::new(catalogs.payloads.clone()),
            skip_banner_grab: options.skip_banner_grab,
            banner_timeout: options.banner_timeout(),
        };
        let internal = InternalHostScanner::new(&factory)
            .with_workers(options.workers)
            .with_arp_timeout(options.arp_timeout());
        internal.scan(hosts, &cancel).await;
    }

    if !options.disable_vuln_lookup {
        analyze(hosts, &catalogs);
    }

    Ok(())
}

/// Run tokenize -> match -> vulnerability lookup -> OS identify over every
/// host's services, mutating `cpe`/`cve` on each [`Service`] and
/// `op_sys`/`os_ver` on each [`Host`].
fn analyze(hosts: &mut [Host], catalogs: &DataCatalogs) {
    let matcher = AutoMatcher::new(&catalogs.regex_catalog.entries, &catalogs.cpe_dictionary);

    for host in hosts.iter_mut() {
        for service in host.services.iter_mut() {
            if !service.alive {
                continue;
            }
            let banner = service.banner_str().into_owned();
            service.cpe = matcher.scan(&banner);
            if !service.cpe.is_empty() {
                let found = vuln_lookup::lookup(&catalogs.cve_catalog, &service.cpe);
                service.cve = found.into_values().flatten().cloned().collect();
            }
        }
        AutoIdentifier.scan(host);
    }
}
