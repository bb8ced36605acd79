//! TCP connect scanner (component 4.C).

use netrecon_core::{Protocol, ScanReason, Service};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Ports probed with a minimal HTTP/1.0 request before reading the banner.
const HTTP_LIKE_PORTS: &[u16] = &[80, 443, 8000, 8008, 8080, 8443, 8888];

#[derive(Debug, Clone)]
pub struct TcpScanner {
    connect_timeout: Duration,
    banner_timeout: Duration,
    skip_banner_grab: bool,
}

impl TcpScanner {
    pub fn new(connect_timeout: Duration, banner_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            banner_timeout,
            skip_banner_grab: false,
        }
    }

    pub fn with_skip_banner_grab(mut self, skip: bool) -> Self {
        self.skip_banner_grab = skip;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    /// Probe a single TCP service in place.
    pub async fn scan_one(&self, service: &mut Service) {
        debug_assert_eq!(service.protocol, Protocol::Tcp);

        let Ok(ip) = service.host_addr.parse() else {
            service.set_outcome(ScanReason::ScanFailed, Vec::new());
            return;
        };
        let addr = SocketAddr::new(ip, service.port);

        match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                debug!(%addr, "tcp connect succeeded");
                let banner = if self.skip_banner_grab {
                    Vec::new()
                } else {
                    self.grab_banner(stream, service.port, addr).await
                };
                service.set_outcome(ScanReason::ReplyReceived, banner);
            }
            Ok(Err(e)) => {
                let reason = match e.kind() {
                    ErrorKind::ConnectionRefused => ScanReason::PortUnreachable,
                    ErrorKind::HostUnreachable => ScanReason::HostUnreachable,
                    _ => ScanReason::ScanFailed,
                };
                debug!(%addr, %e, "tcp connect failed");
                service.set_outcome(reason, Vec::new());
            }
            Err(_) => {
                debug!(%addr, "tcp connect timed out");
                service.set_outcome(ScanReason::TimedOut, Vec::new());
            }
        }
    }

    async fn grab_banner(&self, mut stream: TcpStream, port: u16, addr: SocketAddr) -> Vec<u8> {
        if HTTP_LIKE_PORTS.contains(&port) {
            if let Err(e) = stream.write_all(b"GET / HTTP/1.0\r\n\r\n").await {
                debug!(%addr, %e, "failed to send HTTP probe");
            }
        }

        let mut buf = vec![0u8; 4096];
        match timeout(self.banner_timeout, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => {
                buf.truncate(n);
                buf
            }
            _ => Vec::new(),
        }
    }
}
