//! Service scanner factory (component 4.C): dispatches on [`Protocol`] to
//! the concrete scanner, and drives a batch of services through it via the
//! [`TaskQueueRunner`].
//!
//! ARP is not reachable through this factory: `Protocol` has no `Arp`
//! variant (the data model only carries IPPROTO_TCP/UDP/ICMP/ICMPV6), so the
//! ARP prober is constructed directly by the internal host scanner for
//! local-subnet liveness checks instead of through `Get`.

use crate::icmp_scanner::IcmpScanner;
use crate::runner::{CancelToken, TaskQueueRunner};
use crate::tcp_scanner::TcpScanner;
use crate::udp_scanner::UdpScanner;
use netrecon_core::loader::PayloadCatalog;
use netrecon_core::{Protocol, ScanReason, Service};
use std::sync::Arc;
use std::time::Duration;

pub enum ServiceScanner {
    Tcp(TcpScanner),
    Udp(UdpScanner),
    Icmp(IcmpScanner),
}

impl ServiceScanner {
    pub async fn scan_one(&self, service: &mut Service, cancel: &CancelToken) {
        if cancel.is_cancelled() {
            service.set_outcome(ScanReason::ScanFailed, Vec::new());
            return;
        }
        match self {
            ServiceScanner::Tcp(s) => s.scan_one(service).await,
            ServiceScanner::Udp(s) => s.scan_one(service).await,
            ServiceScanner::Icmp(s) => s.scan_one(service).await,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            ServiceScanner::Tcp(s) => s.timeout(),
            ServiceScanner::Udp(s) => s.timeout_value(),
            ServiceScanner::Icmp(s) => s.timeout_value(),
        }
    }
}

pub struct ServiceScannerFactory {
    pub tcp_timeout: Duration,
    pub udp_timeout: Duration,
    pub icmp_timeout: Duration,
    pub payloads: Arc<PayloadCatalog>,
    pub skip_banner_grab: bool,
    pub banner_timeout: Duration,
}

impl ServiceScannerFactory {
    /// Returns the concrete scanner for `proto`. `Protocol::Icmp` and
    /// `Protocol::IcmpV6` share one implementation, selected by the
    /// service's address family at probe time.
    pub fn get(&self, proto: Protocol) -> ServiceScanner {
        match proto {
            Protocol::Tcp => ServiceScanner::Tcp(
                TcpScanner::new(self.tcp_timeout, self.banner_timeout)
                    .with_skip_banner_grab(self.skip_banner_grab),
            ),
            Protocol::Udp => {
                ServiceScanner::Udp(UdpScanner::new(self.udp_timeout, Arc::clone(&self.payloads)))
            }
            Protocol::Icmp | Protocol::IcmpV6 => {
                ServiceScanner::Icmp(IcmpScanner::new(self.icmp_timeout))
            }
        }
    }
}

/// Probe every service in `services` concurrently, grouping by protocol so
/// each group goes through its own scanner instance, bounded by `workers`.
pub async fn scan_many(
    factory: &ServiceScannerFactory,
    services: &mut [Service],
    workers: usize,
    cancel: &CancelToken,
) {
    let runner = TaskQueueRunner::new(workers);
    let tasks = services.iter_mut().map(|service| {
        let scanner = factory.get(service.protocol);
        async move {
            scanner.scan_one(service, cancel).await;
        }
    });
    runner.run(tasks).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_core::Protocol;
    use std::collections::HashMap;

    fn factory() -> ServiceScannerFactory {
        ServiceScannerFactory {
            tcp_timeout: Duration::from_millis(300),
            udp_timeout: Duration::from_millis(300),
            icmp_timeout: Duration::from_millis(300),
            payloads: Arc::new(PayloadCatalog::from_map(HashMap::new())),
            skip_banner_grab: true,
            banner_timeout: Duration::from_millis(300),
        }
    }

    #[test]
    fn factory_dispatches_tcp_and_icmpv6_to_expected_variants() {
        let factory = factory();
        assert!(matches!(factory.get(Protocol::Tcp), ServiceScanner::Tcp(_)));
        assert!(matches!(
            factory.get(Protocol::IcmpV6),
            ServiceScanner::Icmp(_)
        ));
    }

    #[tokio::test]
    async fn scan_many_marks_refused_tcp_port_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut services = vec![Service::new(addr.ip().to_string(), Protocol::Tcp, addr.port())];
        let cancel = CancelToken::new();
        scan_many(&factory(), &mut services, 4, &cancel).await;

        assert_eq!(services[0].reason, ScanReason::PortUnreachable);
    }

    #[tokio::test]
    async fn scan_many_respects_cancellation() {
        let mut services = vec![Service::new("127.0.0.1", Protocol::Tcp, 1)];
        let cancel = CancelToken::new();
        cancel.cancel();
        scan_many(&factory(), &mut services, 4, &cancel).await;

        assert_eq!(services[0].reason, ScanReason::ScanFailed);
    }
}
