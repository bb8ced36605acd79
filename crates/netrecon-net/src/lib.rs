//! Address/packet utilities, interface enumeration, and privilege detection.

pub mod interface;
pub mod packet_builder;
pub mod privilege;

pub use interface::{
    enumerate_interfaces, find_interface_by_name, find_interface_for_target,
    get_source_ip_for_target, InterfaceError, NetworkInterface,
};
pub use packet_builder::{
    ArpPacketBuilder, ArpReply, IcmpPacketBuilder, IcmpVerdict, Icmpv6PacketBuilder,
    PacketBuilderError,
};
pub use privilege::{check_privileges, has_raw_socket_capability};
