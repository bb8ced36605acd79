//! Checksummed header construction for the ICMP/ICMPv6 pinger and the ARP
//! prober (component 4.A). TCP and UDP probing in this system goes through
//! cooked OS sockets (`tokio::net::{TcpStream, UdpSocket}`), so this module
//! only needs to hand-craft the two protocols actually sent over raw sockets.

use pnet_packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet_packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet_packet::icmp::{self, echo_reply, echo_request, IcmpPacket, IcmpTypes};
use pnet_packet::icmpv6::{self, Icmpv6Packet, Icmpv6Types};
use pnet::util::MacAddr;
use pnet_packet::Packet;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketBuilderError {
    #[error("buffer too small for packet: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, PacketBuilderError>;

/// Build and parse ICMPv4 Echo Request/Reply packets.
pub struct IcmpPacketBuilder;

impl IcmpPacketBuilder {
    /// Build an Echo Request with checksum set, ready for a raw `IPPROTO_ICMP` socket.
    pub fn echo_request(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
        let total_len = echo_request::MutableEchoRequestPacket::minimum_packet_size() + payload.len();
        let mut buffer = vec![0u8; total_len];
        {
            let mut packet = echo_request::MutableEchoRequestPacket::new(&mut buffer)
                .expect("buffer sized to fit echo request");
            packet.set_icmp_type(IcmpTypes::EchoRequest);
            packet.set_icmp_code(echo_request::IcmpCodes::NoCode);
            packet.set_identifier(identifier);
            packet.set_sequence_number(sequence);
            packet.set_payload(payload);
        }
        let checksum = icmp::checksum(&IcmpPacket::new(&buffer).expect("valid icmp packet"));
        let mut packet =
            echo_request::MutableEchoRequestPacket::new(&mut buffer).expect("buffer sized to fit");
        packet.set_checksum(checksum);
        buffer
    }

    /// Classify a received ICMPv4 packet (payload of the IP packet, after the IP header).
    pub fn classify(data: &[u8]) -> Option<IcmpVerdict> {
        let packet = IcmpPacket::new(data)?;
        match packet.get_icmp_type() {
            IcmpTypes::EchoReply => {
                let reply = echo_reply::EchoReplyPacket::new(data)?;
                Some(IcmpVerdict::EchoReply {
                    identifier: reply.get_identifier(),
                    sequence: reply.get_sequence_number(),
                })
            }
            IcmpTypes::DestinationUnreachable => Some(IcmpVerdict::Unreachable),
            _ => None,
        }
    }
}

/// Build and parse ICMPv6 Echo Request/Reply packets.
pub struct Icmpv6PacketBuilder;

impl Icmpv6PacketBuilder {
    /// Build an Echo Request with the pseudo-header checksum set.
    pub fn echo_request(
        source: Ipv6Addr,
        destination: Ipv6Addr,
        identifier: u16,
        sequence: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        use pnet_packet::icmpv6::echo_request::MutableEchoRequestPacket;

        let total_len = MutableEchoRequestPacket::minimum_packet_size() + payload.len();
        let mut buffer = vec![0u8; total_len];
        {
            let mut packet =
                MutableEchoRequestPacket::new(&mut buffer).expect("buffer sized to fit");
            packet.set_icmpv6_type(Icmpv6Types::EchoRequest);
            packet.set_icmpv6_code(pnet_packet::icmpv6::echo_request::Icmpv6Codes::NoCode);
            packet.set_identifier(identifier);
            packet.set_sequence_number(sequence);
            packet.set_payload(payload);
        }
        let checksum = icmpv6::checksum(
            &Icmpv6Packet::new(&buffer).expect("valid icmpv6 packet"),
            &source,
            &destination,
        );
        let mut packet =
            MutableEchoRequestPacket::new(&mut buffer).expect("buffer sized to fit");
        packet.set_checksum(checksum);
        buffer
    }

    pub fn classify(data: &[u8]) -> Option<IcmpVerdict> {
        use pnet_packet::icmpv6::echo_reply::EchoReplyPacket;

        let packet = Icmpv6Packet::new(data)?;
        match packet.get_icmpv6_type() {
            Icmpv6Types::EchoReply => {
                let reply = EchoReplyPacket::new(data)?;
                Some(IcmpVerdict::EchoReply {
                    identifier: reply.get_identifier(),
                    sequence: reply.get_sequence_number(),
                })
            }
            Icmpv6Types::DestinationUnreachable => Some(IcmpVerdict::Unreachable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpVerdict {
    EchoReply { identifier: u16, sequence: u16 },
    Unreachable,
}

/// Build and parse Ethernet-framed ARP request/reply packets.
pub struct ArpPacketBuilder;

impl ArpPacketBuilder {
    /// Build a broadcast ARP request frame (`who-has dst_ip tell src_ip`).
    pub fn request(src_mac: MacAddr, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Result<Vec<u8>> {
        let arp_len = MutableArpPacket::minimum_packet_size();
        let eth_len = MutableEthernetPacket::minimum_packet_size();
        let total_len = eth_len + arp_len;
        let mut buffer = vec![0u8; total_len];

        {
            let mut eth = MutableEthernetPacket::new(&mut buffer[..eth_len]).ok_or(
                PacketBuilderError::BufferTooSmall {
                    needed: eth_len,
                    available: total_len,
                },
            )?;
            eth.set_destination(MacAddr::broadcast());
            eth.set_source(src_mac);
            eth.set_ethertype(EtherTypes::Arp);
        }

        {
            let mut arp = MutableArpPacket::new(&mut buffer[eth_len..]).ok_or(
                PacketBuilderError::BufferTooSmall {
                    needed: arp_len,
                    available: total_len - eth_len,
                },
            )?;
            arp.set_hardware_type(ArpHardwareTypes::Ethernet);
            arp.set_protocol_type(EtherTypes::Ipv4);
            arp.set_hw_addr_len(6);
            arp.set_proto_addr_len(4);
            arp.set_operation(ArpOperations::Request);
            arp.set_sender_hw_addr(src_mac);
            arp.set_sender_proto_addr(src_ip);
            arp.set_target_hw_addr(MacAddr::zero());
            arp.set_target_proto_addr(dst_ip);
        }

        Ok(buffer)
    }

    /// Parse an Ethernet frame, returning the sender's hardware/protocol address
    /// if it is an ARP reply.
    pub fn parse_reply(frame: &[u8]) -> Option<ArpReply> {
        let eth = EthernetPacket::new(frame)?;
        if eth.get_ethertype() != EtherTypes::Arp {
            return None;
        }
        let arp = ArpPacket::new(eth.payload())?;
        if arp.get_operation() != ArpOperations::Reply {
            return None;
        }
        Some(ArpReply {
            sender_mac: arp.get_sender_hw_addr(),
            sender_ip: arp.get_sender_proto_addr(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpReply {
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icmp_echo_request_checksum_round_trips() {
        let packet = IcmpPacketBuilder::echo_request(0x1234, 1, b"ping");
        let parsed = IcmpPacket::new(&packet).unwrap();
        assert_eq!(icmp::checksum(&parsed), parsed.get_checksum());
    }

    #[test]
    fn icmpv6_echo_request_checksum_round_trips() {
        let src: Ipv6Addr = "fe80::1".parse().unwrap();
        let dst: Ipv6Addr = "fe80::2".parse().unwrap();
        let packet = Icmpv6PacketBuilder::echo_request(src, dst, 42, 1, b"ping6");
        let parsed = Icmpv6Packet::new(&packet).unwrap();
        assert_eq!(icmpv6::checksum(&parsed, &src, &dst), parsed.get_checksum());
    }

    #[test]
    fn arp_request_round_trips_through_parse_reply_shape() {
        let src_mac = MacAddr::new(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
        let src_ip: Ipv4Addr = "192.168.1.10".parse().unwrap();
        let dst_ip: Ipv4Addr = "192.168.1.1".parse().unwrap();
        let request = ArpPacketBuilder::request(src_mac, src_ip, dst_ip).unwrap();

        let eth = EthernetPacket::new(&request).unwrap();
        assert_eq!(eth.get_ethertype(), EtherTypes::Arp);
        assert_eq!(eth.get_destination(), MacAddr::broadcast());

        let arp = ArpPacket::new(eth.payload()).unwrap();
        assert_eq!(arp.get_operation(), ArpOperations::Request);
        assert_eq!(arp.get_sender_proto_addr(), src_ip);
        assert_eq!(arp.get_target_proto_addr(), dst_ip);
    }

    #[test]
    fn parse_reply_rejects_non_arp_frames() {
        let mut frame = vec![0u8; 64];
        let mut eth = MutableEthernetPacket::new(&mut frame).unwrap();
        eth.set_ethertype(EtherTypes::Ipv4);
        assert!(ArpPacketBuilder::parse_reply(&frame).is_none());
    }
}
