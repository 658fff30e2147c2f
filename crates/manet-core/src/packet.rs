//! Routing and data packets
//!
//! Control packets (RREQ/RREP) and application data share one [`Packet`]
//! enum. A [`Frame`] is a packet on the air: who sent it on this hop and who
//! it is addressed to.

use std::fmt;
use std::time::Duration;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::PacketError;
use crate::identity::NodeId;
use crate::time::SimTime;

/// IP + UDP header bytes added to every packet on the air
pub const IP_UDP_HEADER: usize = 28;

/// IANA protocol number for UDP
pub const PROTO_UDP: u8 = 17;

/// Route request identifier, unique per originator
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct RequestId(pub u32);

impl RequestId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Destination sequence number
///
/// Compared with serial-number arithmetic so that freshness survives
/// wrap-around.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display("{_0}")]
pub struct SeqNo(pub u32);

impl SeqNo {
    /// True if `self` is strictly fresher than `other`
    pub fn is_newer_than(self, other: SeqNo) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }

    /// The fresher of the two
    pub fn max(self, other: SeqNo) -> SeqNo {
        if other.is_newer_than(self) { other } else { self }
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Route request, flooded from the originator towards the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub originator: NodeId,
    pub destination: NodeId,
    pub request_id: RequestId,
    /// Hops travelled so far, incremented by each receiver
    pub hop_count: u8,
    pub originator_seq: SeqNo,
    /// Last destination sequence number the originator knew of
    pub destination_seq: Option<SeqNo>,
    /// When the originator sent this request
    pub sent_at: SimTime,
}

/// Route reply, unicast from the destination back to the originator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteReply {
    /// The discovery originator (where the reply is headed)
    pub originator: NodeId,
    /// The node the route leads to (where the reply came from)
    pub destination: NodeId,
    pub request_id: RequestId,
    pub hop_count: u8,
    pub destination_seq: SeqNo,
    /// Echoed from the request
    pub sent_at: SimTime,
    pub lifetime: Duration,
}

/// What an application data packet carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    EchoRequest,
    EchoReply,
}

/// End-to-end flow identity (five-tuple equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub source: NodeId,
    pub destination: NodeId,
    pub protocol: u8,
    pub source_port: u16,
    pub destination_port: u16,
}

impl FlowKey {
    /// A UDP flow
    pub fn udp(source: NodeId, source_port: u16, destination: NodeId, destination_port: u16) -> Self {
        Self {
            source,
            destination,
            protocol: PROTO_UDP,
            source_port,
            destination_port,
        }
    }

    /// The same flow in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            source: self.destination,
            destination: self.source,
            protocol: self.protocol,
            source_port: self.destination_port,
            destination_port: self.source_port,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = match self.protocol {
            PROTO_UDP => "UDP".to_string(),
            other => other.to_string(),
        };
        write!(
            f,
            "{}:{} -> {}:{} ({})",
            self.source, self.source_port, self.destination, self.destination_port, proto
        )
    }
}

/// Application payload travelling along an installed route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPacket {
    pub flow: FlowKey,
    /// Sequence within the flow
    pub sequence: u32,
    pub payload_len: u32,
    pub kind: DataKind,
    /// Application send time
    pub sent_at: SimTime,
}

impl DataPacket {
    pub fn source(&self) -> NodeId {
        self.flow.source
    }

    pub fn destination(&self) -> NodeId {
        self.flow.destination
    }
}

/// Anything a node puts on the air
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    RouteRequest(RouteRequest),
    RouteReply(RouteReply),
    Data(DataPacket),
}

impl Packet {
    /// Short name for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::RouteRequest(_) => "RREQ",
            Self::RouteReply(_) => "RREP",
            Self::Data(_) => "DATA",
        }
    }

    pub fn is_control(&self) -> bool {
        !matches!(self, Self::Data(_))
    }

    /// Postcard-encoded size of the packet
    pub fn encoded_len(&self) -> Result<usize, PacketError> {
        Ok(postcard::to_allocvec(self)?.len())
    }

    /// Bytes on the air including the IP/UDP header
    ///
    /// Data packets count their declared payload length rather than their
    /// encoding.
    pub fn wire_size(&self) -> Result<usize, PacketError> {
        let body = match self {
            Self::Data(data) => data.payload_len as usize,
            _ => self.encoded_len()?,
        };
        Ok(body + IP_UDP_HEADER)
    }
}

/// Link-layer addressing of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Addressing {
    Broadcast,
    Unicast(NodeId),
}

/// A packet on a single hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Previous hop
    pub sender: NodeId,
    pub to: Addressing,
    pub packet: Packet,
}

impl Frame {
    pub fn broadcast(sender: NodeId, packet: Packet) -> Self {
        Self {
            sender,
            to: Addressing::Broadcast,
            packet,
        }
    }

    pub fn unicast(sender: NodeId, next_hop: NodeId, packet: Packet) -> Self {
        Self {
            sender,
            to: Addressing::Unicast(next_hop),
            packet,
        }
    }

    /// Whether `node` should process this frame when it hears it
    pub fn is_addressed_to(&self, node: NodeId) -> bool {
        match self.to {
            Addressing::Broadcast => node != self.sender,
            Addressing::Unicast(next_hop) => next_hop == node,
        }
    }

    pub fn wire_size(&self) -> Result<usize, PacketError> {
        self.packet.wire_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rreq() -> RouteRequest {
        RouteRequest {
            originator: NodeId(1),
            destination: NodeId(4),
            request_id: RequestId(1),
            hop_count: 0,
            originator_seq: SeqNo(1),
            destination_seq: None,
            sent_at: SimTime::from_secs(2),
        }
    }

    #[test]
    fn test_seq_no_wraparound() {
        assert!(SeqNo(5).is_newer_than(SeqNo(4)));
        assert!(!SeqNo(4).is_newer_than(SeqNo(4)));
        assert!(!SeqNo(3).is_newer_than(SeqNo(4)));
        assert!(SeqNo(0).is_newer_than(SeqNo(u32::MAX)));
        assert_eq!(SeqNo(u32::MAX).next(), SeqNo(0));
        assert_eq!(SeqNo(2).max(SeqNo(7)), SeqNo(7));
    }

    #[test]
    fn test_flow_key_reversed() {
        let key = FlowKey::udp(NodeId(1), 49153, NodeId(4), 9);
        let back = key.reversed();
        assert_eq!(back.source, NodeId(4));
        assert_eq!(back.source_port, 9);
        assert_eq!(back.destination_port, 49153);
        assert_eq!(back.reversed(), key);
        assert_eq!(key.to_string(), "n1:49153 -> n4:9 (UDP)");
    }

    #[test]
    fn test_wire_size() {
        let control = Packet::RouteRequest(rreq());
        let size = control.wire_size().unwrap();
        assert_eq!(size, control.encoded_len().unwrap() + IP_UDP_HEADER);

        let data = Packet::Data(DataPacket {
            flow: FlowKey::udp(NodeId(1), 49153, NodeId(4), 9),
            sequence: 0,
            payload_len: 1024,
            kind: DataKind::EchoRequest,
            sent_at: SimTime::ZERO,
        });
        assert_eq!(data.wire_size().unwrap(), 1024 + IP_UDP_HEADER);
    }

    #[test]
    fn test_frame_addressing() {
        let frame = Frame::broadcast(NodeId(1), Packet::RouteRequest(rreq()));
        assert!(frame.is_addressed_to(NodeId(2)));
        assert!(!frame.is_addressed_to(NodeId(1)));

        let frame = Frame::unicast(NodeId(1), NodeId(2), Packet::RouteRequest(rreq()));
        assert!(frame.is_addressed_to(NodeId(2)));
        assert!(!frame.is_addressed_to(NodeId(0)));
    }
}
