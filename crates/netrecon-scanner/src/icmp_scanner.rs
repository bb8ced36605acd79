//! ICMP/ICMPv6 echo scanner (component 4.C).
//!
//! Needs a raw socket, so it talks straight to `socket2` rather than going
//! through tokio's async net types.

use netrecon_core::{Protocol, ScanReason, Service};
use netrecon_net::packet_builder::{IcmpPacketBuilder, IcmpVerdict, Icmpv6PacketBuilder};
use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

static SEQUENCE: AtomicU16 = AtomicU16::new(1);

/// Low 16 bits of the process id, used as the echo identifier for every probe
/// this process sends — lets replies be told apart from another scanner's.
fn identifier() -> u16 {
    std::process::id() as u16
}

#[derive(Debug, Clone)]
pub struct IcmpScanner {
    timeout: Duration,
}

impl IcmpScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub async fn scan_one(&self, service: &mut Service) {
        let Ok(ip) = service.host_addr.parse::<IpAddr>() else {
            service.set_outcome(ScanReason::ScanFailed, Vec::new());
            return;
        };

        let timeout = self.timeout;
        let result = tokio::task::spawn_blocking(move || ping(ip, timeout)).await;

        match result {
            Ok(Ok(Some(reply))) => service.set_outcome(ScanReason::ReplyReceived, reply),
            Ok(Ok(None)) => service.set_outcome(ScanReason::TimedOut, Vec::new()),
            Ok(Err(PingError::Unreachable)) => {
                service.set_outcome(ScanReason::IcmpUnreachable, Vec::new())
            }
            Ok(Err(PingError::Io(e))) => {
                debug!(%ip, %e, "icmp ping failed");
                service.set_outcome(ScanReason::ScanFailed, Vec::new());
            }
            Err(e) => {
                debug!(%e, "icmp ping task panicked");
                service.set_outcome(ScanReason::ScanFailed, Vec::new());
            }
        }
    }
}

enum PingError {
    Unreachable,
    Io(io::Error),
}

impl From<io::Error> for PingError {
    fn from(e: io::Error) -> Self {
        PingError::Io(e)
    }
}

fn ping(ip: IpAddr, timeout: Duration) -> Result<Option<Vec<u8>>, PingError> {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let ident = identifier();
    let payload = b"netrecon-ping";

    let (socket, request) = match ip {
        IpAddr::V4(_) => {
            let socket = Socket::new(Domain::IPV4, Type::RAW, Some(SockProtocol::ICMPV4))?;
            (socket, IcmpPacketBuilder::echo_request(ident, seq, payload))
        }
        IpAddr::V6(dst) => {
            let socket = Socket::new(Domain::IPV6, Type::RAW, Some(SockProtocol::ICMPV6))?;
            let src = Ipv6Addr::UNSPECIFIED;
            (
                socket,
                Icmpv6PacketBuilder::echo_request(src, dst, ident, seq, payload),
            )
        }
    };

    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;
    socket.send_to(&request, &SocketAddr::new(ip, 0).into())?;

    let deadline = Instant::now() + timeout;
    let mut buf = [std::mem::MaybeUninit::new(0u8); 2048];

    loop {
        if Instant::now() >= deadline {
            return Ok(None);
        }
        let (n, _) = match socket.recv_from(&mut buf) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                return Ok(None)
            }
            Err(e) => return Err(PingError::Io(e)),
        };

        // SAFETY: `recv_from` initialized the first `n` bytes.
        let bytes: Vec<u8> = buf[..n]
            .iter()
            .map(|b| unsafe { b.assume_init() })
            .collect();

        let icmp_payload = match ip {
            IpAddr::V4(_) => {
                // Skip the IPv4 header recv_from hands back with a raw ICMPv4 socket.
                let ihl = (bytes.first().copied().unwrap_or(0x45) & 0x0f) as usize * 4;
                if bytes.len() <= ihl {
                    continue;
                }
                &bytes[ihl..]
            }
            IpAddr::V6(_) => &bytes[..],
        };

        let verdict = match ip {
            IpAddr::V4(_) => IcmpPacketBuilder::classify(icmp_payload),
            IpAddr::V6(_) => Icmpv6PacketBuilder::classify(icmp_payload),
        };

        match verdict {
            Some(IcmpVerdict::EchoReply {
                identifier: rid,
                sequence: rseq,
            }) if rid == ident && rseq == seq => return Ok(Some(icmp_payload.to_vec())),
            Some(IcmpVerdict::Unreachable) => return Err(PingError::Unreachable),
            _ => continue,
        }
    }
}

#[allow(dead_code)]
fn assert_protocol_is_icmp(p: Protocol) -> bool {
    matches!(p, Protocol::Icmp | Protocol::IcmpV6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires CAP_NET_RAW"]
    async fn loopback_ping_replies() {
        let scanner = IcmpScanner::new(Duration::from_secs(1));
        let mut service = Service::new("127.0.0.1", Protocol::Icmp, 0);
        scanner.scan_one(&mut service).await;
        assert_eq!(service.reason, ScanReason::ReplyReceived);
    }

    #[test]
    fn identifier_is_stable_within_process() {
        assert_eq!(identifier(), identifier());
    }
}
