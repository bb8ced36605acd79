//! ARP prober (component 4.C).
//!
//! Only probes targets inside a locally attached IPv4 subnet; anything else
//! fails without sending traffic, since ARP never routes off-link.

use netrecon_core::{ScanReason, Service};
use netrecon_net::interface::{enumerate_interfaces, find_interface_for_target, NetworkInterface};
use netrecon_net::packet_builder::ArpPacketBuilder;
use pnet_datalink::{self, Channel, NetworkInterface as DatalinkInterface};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ArpScanner {
    timeout: Duration,
}

impl ArpScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    /// `true` if `addr` falls inside a CIDR attached to one of our own
    /// up, non-loopback interfaces. ARP never routes off-link, so anything
    /// outside every locally attached subnet must fail without sending
    /// traffic rather than being probed.
    pub fn is_local(addr: Ipv4Addr) -> bool {
        let target = std::net::IpAddr::V4(addr);
        let Ok(interfaces) = enumerate_interfaces() else {
            return false;
        };
        interfaces
            .iter()
            .filter(|iface| iface.is_up && !iface.is_loopback)
            .any(|iface| iface.contains(target))
    }

    pub async fn scan_one(&self, service: &mut Service) {
        let Ok(std::net::IpAddr::V4(addr)) = service.host_addr.parse() else {
            service.set_outcome(ScanReason::ScanFailed, Vec::new());
            return;
        };

        let timeout = self.timeout;
        let result = tokio::task::spawn_blocking(move || arp_probe(addr, timeout)).await;

        match result {
            Ok(Some(mac)) => {
                service.set_outcome(ScanReason::ReplyReceived, mac.to_string().into_bytes())
            }
            Ok(None) => service.set_outcome(ScanReason::TimedOut, Vec::new()),
            Err(e) => {
                debug!(%addr, %e, "arp probe task panicked");
                service.set_outcome(ScanReason::ScanFailed, Vec::new());
            }
        }
    }
}

fn arp_probe(target: Ipv4Addr, timeout: Duration) -> Option<pnet::util::MacAddr> {
    let iface = find_interface_for_target(std::net::IpAddr::V4(target)).ok()?;
    let datalink_iface = matching_datalink_interface(&iface)?;
    let src_mac = datalink_iface.mac?;
    let src_ip = iface.first_ipv4()?;

    let (mut tx, mut rx) = match pnet_datalink::channel(&datalink_iface, Default::default()) {
        Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
        _ => return None,
    };

    let request = ArpPacketBuilder::request(src_mac, src_ip, target).ok()?;
    tx.send_to(&request, None)?.ok()?;

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let frame = match rx.next() {
            Ok(f) => f,
            Err(_) => continue,
        };
        if let Some(reply) = ArpPacketBuilder::parse_reply(frame) {
            if reply.sender_ip == target {
                return Some(reply.sender_mac);
            }
        }
    }
    None
}

fn matching_datalink_interface(iface: &NetworkInterface) -> Option<DatalinkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|i| i.name == iface.name)
}
