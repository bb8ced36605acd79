//! UDP scanner (component 4.C).
//!
//! Uses a connected `UdpSocket`: on Linux a connected UDP socket surfaces a
//! subsequent ICMP port-unreachable as `ECONNREFUSED` on the next read,
//! letting the probe stay entirely in cooked-socket territory.

use netrecon_core::loader::PayloadCatalog;
use netrecon_core::{Protocol, ScanReason, Service};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct UdpScanner {
    timeout: Duration,
    payloads: Arc<PayloadCatalog>,
}

impl UdpScanner {
    pub fn new(timeout: Duration, payloads: Arc<PayloadCatalog>) -> Self {
        Self { timeout, payloads }
    }

    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub async fn scan_one(&self, service: &mut Service) {
        debug_assert_eq!(service.protocol, Protocol::Udp);

        let Ok(ip) = service.host_addr.parse() else {
            service.set_outcome(ScanReason::ScanFailed, Vec::new());
            return;
        };
        let addr = SocketAddr::new(ip, service.port);

        let bind_addr = if ip.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = match UdpSocket::bind(bind_addr).await {
            Ok(s) => s,
            Err(e) => {
                debug!(%addr, %e, "failed to bind udp socket");
                service.set_outcome(ScanReason::ScanFailed, Vec::new());
                return;
            }
        };

        if let Err(e) = socket.connect(addr).await {
            debug!(%addr, %e, "failed to connect udp socket");
            service.set_outcome(ScanReason::ScanFailed, Vec::new());
            return;
        }

        let payloads = self.payloads.payloads_for(service.port);
        let probes: Vec<Vec<u8>> = if payloads.is_empty() {
            vec![Vec::new()]
        } else {
            payloads.to_vec()
        };

        for payload in &probes {
            if let Err(e) = socket.send(payload).await {
                if e.kind() == ErrorKind::ConnectionRefused {
                    service.set_outcome(ScanReason::PortUnreachable, Vec::new());
                    return;
                }
                debug!(%addr, %e, "failed to send udp payload");
            }
        }

        let mut buf = vec![0u8; 4096];
        match timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                service.set_outcome(ScanReason::ReplyReceived, buf);
            }
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                service.set_outcome(ScanReason::PortUnreachable, Vec::new());
            }
            Ok(Err(e)) => {
                debug!(%addr, %e, "udp recv error");
                service.set_outcome(ScanReason::ScanFailed, Vec::new());
            }
            Err(_) => {
                service.set_outcome(ScanReason::TimedOut, Vec::new());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_port_replies_with_banner() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let server_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 64];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"probe");
            server.send_to(b"pong", peer).await.unwrap();
        });

        let mut by_port = std::collections::HashMap::new();
        by_port.insert(server_addr.port(), vec![b"probe".to_vec()]);
        let catalog = PayloadCatalog::from_map(by_port);

        let scanner = UdpScanner::new(Duration::from_secs(1), Arc::new(catalog));
        let mut service =
            Service::new(server_addr.ip().to_string(), Protocol::Udp, server_addr.port());
        scanner.scan_one(&mut service).await;

        assert!(service.alive);
        assert_eq!(service.reason, ScanReason::ReplyReceived);
        assert_eq!(service.banner, b"pong");
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn closed_port_times_out_without_a_listener() {
        let bound = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = bound.local_addr().unwrap();
        drop(bound);

        let scanner = UdpScanner::new(Duration::from_millis(200), Arc::new(PayloadCatalog::default()));
        let mut service = Service::new(addr.ip().to_string(), Protocol::Udp, addr.port());
        scanner.scan_one(&mut service).await;

        assert!(matches!(
            service.reason,
            ScanReason::TimedOut | ScanReason::PortUnreachable
        ));
        assert!(!service.alive);
    }
}
