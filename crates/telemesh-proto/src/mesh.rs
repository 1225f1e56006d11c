//! Mesh control packet codec.
//!
//! Mesh traffic shares the four-byte packet header with sensor data,
//! pinned to variant 15, followed by a control nibble and a per-type
//! body. Seven control types cover tree maintenance (BEACON), upstream
//! relay (FORWARD/ACK), failure signalling (ROUTE_ERROR), topology
//! reporting (NEIGHBOUR_RPT) and liveness probes (PING/PONG).
//!
//! Layouts are bit-exact per type; [`pack_4_12`] carries the recurring
//! nibble-plus-station pattern shared by BEACON, FORWARD and ACK.

use bytes::Bytes;

use crate::{
    bitstream::{BitReader, BitWriter, bits_to_bytes},
    errors::{CodecError, Result},
    header::{HEADER_BYTES, PacketHeader},
    schema::MESH_VARIANT,
};

/// Sentinel station id for "no parent selected".
pub const PARENT_NONE: u16 = 0xFFF;

/// Default forwarding TTL.
pub const TTL_DEFAULT: u8 = 7;

/// Modulus of the beacon generation counter.
pub const GENERATION_MODULUS: u16 = 4096;

/// Entry limit for one neighbour report.
pub const NEIGHBOUR_REPORT_MAX: usize = 63;

/// Smallest complete mesh packet (ROUTE_ERROR).
pub const MESH_MIN_BYTES: usize = 5;

/// Pack a 4-bit value and a 12-bit value into two bytes.
#[must_use]
pub fn pack_4_12(hi: u8, lo: u16) -> [u8; 2] {
    [(hi << 4) | ((lo >> 8) as u8 & 0x0F), (lo & 0xFF) as u8]
}

/// Inverse of [`pack_4_12`].
#[must_use]
pub fn unpack_4_12(bytes: [u8; 2]) -> (u8, u16) {
    (bytes[0] >> 4, (u16::from(bytes[0] & 0x0F) << 8) | u16::from(bytes[1]))
}

/// Route error reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteErrorReason {
    /// The sender lost its parent and is re-acquiring.
    ParentLost = 0,
    /// The sender cannot take more relay load.
    Overloaded = 1,
    /// The sender is shutting down.
    Shutdown = 2,
}

impl RouteErrorReason {
    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(RouteErrorReason::ParentLost),
            1 => Ok(RouteErrorReason::Overloaded),
            2 => Ok(RouteErrorReason::Shutdown),
            other => Err(CodecError::MeshReasonUnknown(other)),
        }
    }
}

/// One neighbour table entry as carried in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeighbourEntry {
    /// Neighbour station id.
    pub station: u16,
    /// Quantized RSSI (4 bits, 5 dBm steps, floor -120).
    pub rssi_q: u8,
    /// Per-neighbour flag nibble.
    pub flags: u8,
}

/// Mesh control body, one variant per control type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeshControl {
    /// Tree advertisement from the gateway or a joined hop.
    Beacon {
        /// Gateway station this tree leads to.
        gateway: u16,
        /// Sender's path cost to the gateway.
        cost: u8,
        /// Advertisement flag nibble.
        flags: u8,
        /// 12-bit modular beacon generation.
        generation: u16,
    },
    /// Upstream relay of a wrapped sensor packet.
    Forward {
        /// Remaining hop budget.
        ttl: u8,
        /// Complete inner packet, header included.
        inner: Bytes,
    },
    /// Hop-local receipt for a FORWARD.
    Ack {
        /// Origin station of the forwarded packet.
        station: u16,
        /// Origin sequence of the forwarded packet.
        sequence: u16,
    },
    /// Failure signal; the sender has invalidated its parent.
    RouteError {
        /// Why the route failed.
        reason: RouteErrorReason,
    },
    /// Neighbour table snapshot.
    NeighbourReport {
        /// Sender's current parent (or [`PARENT_NONE`]).
        parent: u16,
        /// Sender's path cost.
        cost: u8,
        /// Up to [`NEIGHBOUR_REPORT_MAX`] entries.
        entries: Vec<NeighbourEntry>,
    },
    /// Liveness probe.
    Ping {
        /// Echo token.
        tag: u16,
    },
    /// Probe reply carrying the probe's token.
    Pong {
        /// Echo token.
        tag: u16,
    },
}

impl MeshControl {
    /// Control type nibble.
    #[must_use]
    pub fn control_type(&self) -> u8 {
        match self {
            MeshControl::Beacon { .. } => 0,
            MeshControl::Forward { .. } => 1,
            MeshControl::Ack { .. } => 2,
            MeshControl::RouteError { .. } => 3,
            MeshControl::NeighbourReport { .. } => 4,
            MeshControl::Ping { .. } => 5,
            MeshControl::Pong { .. } => 6,
        }
    }
}

/// A complete mesh packet: shared header plus control body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshPacket {
    /// Station of the hop that transmitted this frame (not the origin).
    pub sender: u16,
    /// Sender's sequence number.
    pub sequence: u16,
    /// Control body.
    pub control: MeshControl,
}

impl MeshPacket {
    /// Wire length in bytes.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        let body_bits = match &self.control {
            MeshControl::Beacon { .. } => 4 + 12 + 8 + 4 + 12,
            MeshControl::Forward { inner, .. } => 4 + 8 + 4 + inner.len() * 8,
            MeshControl::Ack { .. } => 4 + 12 + 16,
            MeshControl::RouteError { .. } => 4 + 4,
            MeshControl::NeighbourReport { entries, .. } => 4 + 12 + 8 + 8 + 16 + entries.len() * 24,
            MeshControl::Ping { .. } | MeshControl::Pong { .. } => 4 + 4 + 16 + 8,
        };
        bits_to_bytes(HEADER_BYTES * 8 + body_bits)
    }

    /// Encode into `buf`, returning the byte length.
    ///
    /// # Errors
    ///
    /// Station/reason/report validation errors, or `BitOverflow` when
    /// `buf` is too small.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        PacketHeader::check_station(self.sender)?;
        let mut w = BitWriter::new(buf);
        let header =
            PacketHeader { variant: MESH_VARIANT, station: self.sender, sequence: self.sequence };
        header.pack(&mut w)?;
        w.write(u64::from(self.control_type()), 4)?;
        match &self.control {
            MeshControl::Beacon { gateway, cost, flags, generation } => {
                PacketHeader::check_station(*gateway)?;
                w.write(u64::from(*gateway), 12)?;
                w.write(u64::from(*cost), 8)?;
                w.write(u64::from(*flags & 0x0F), 4)?;
                w.write(u64::from(*generation % GENERATION_MODULUS), 12)?;
            },
            MeshControl::Forward { ttl, inner } => {
                if inner.len() < MESH_MIN_BYTES {
                    return Err(CodecError::MeshInnerTooShort {
                        len: inner.len(),
                        needed: MESH_MIN_BYTES,
                    });
                }
                w.write(u64::from(*ttl), 8)?;
                w.write(0, 4)?; // pad to the byte boundary
                w.write_bytes(inner)?;
            },
            MeshControl::Ack { station, sequence } => {
                w.write(u64::from(*station), 12)?;
                w.write(u64::from(*sequence), 16)?;
            },
            MeshControl::RouteError { reason } => {
                w.write(u64::from(*reason as u8), 4)?;
            },
            MeshControl::NeighbourReport { parent, cost, entries } => {
                if entries.len() > NEIGHBOUR_REPORT_MAX {
                    return Err(CodecError::MeshReportTooLarge {
                        count: entries.len(),
                        max: NEIGHBOUR_REPORT_MAX,
                    });
                }
                w.write(u64::from(*parent & 0xFFF), 12)?;
                w.write(u64::from(*cost), 8)?;
                w.write(entries.len() as u64, 8)?;
                w.write(0, 16)?; // reserved
                for entry in entries {
                    w.write(u64::from(entry.station & 0xFFF), 12)?;
                    w.write(u64::from(entry.rssi_q & 0x0F), 4)?;
                    w.write(u64::from(entry.flags & 0x0F), 4)?;
                    w.write(0, 4)?; // reserved
                }
            },
            MeshControl::Ping { tag } | MeshControl::Pong { tag } => {
                w.write(0, 4)?; // pad
                w.write(u64::from(*tag), 16)?;
                w.write(0, 8)?; // reserved
            },
        }
        Ok(w.byte_len())
    }

    /// Encode into a fresh buffer.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.wire_len()];
        let len = self.encode(&mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Decode a mesh packet.
    ///
    /// # Errors
    ///
    /// `NotMeshVariant` when the header is not variant 15,
    /// `MeshControlUnknown` for an undefined control nibble, and
    /// `Truncated` when a body runs past the buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MESH_MIN_BYTES {
            return Err(CodecError::DecodeShort { len: bytes.len(), needed: MESH_MIN_BYTES });
        }
        let mut r = BitReader::new(bytes);
        let header = PacketHeader::unpack(&mut r)?;
        if header.variant != MESH_VARIANT {
            return Err(CodecError::NotMeshVariant { variant: header.variant });
        }
        PacketHeader::check_station(header.station)?;
        let ctrl = r.try_read(4)? as u8;
        let control = match ctrl {
            0 => {
                let gateway = r.try_read(12)? as u16;
                PacketHeader::check_station(gateway)?;
                let cost = r.try_read(8)? as u8;
                let flags = r.try_read(4)? as u8;
                let generation = r.try_read(12)? as u16;
                MeshControl::Beacon { gateway, cost, flags, generation }
            },
            1 => {
                let ttl = r.try_read(8)? as u8;
                let _pad = r.try_read(4)?;
                debug_assert_eq!(r.position() % 8, 0);
                let inner_len = bytes.len() - r.position() / 8;
                if inner_len < MESH_MIN_BYTES {
                    return Err(CodecError::MeshInnerTooShort {
                        len: inner_len,
                        needed: MESH_MIN_BYTES,
                    });
                }
                let inner = Bytes::from(r.try_read_bytes(inner_len)?);
                MeshControl::Forward { ttl, inner }
            },
            2 => {
                let station = r.try_read(12)? as u16;
                let sequence = r.try_read(16)? as u16;
                MeshControl::Ack { station, sequence }
            },
            3 => {
                let reason = RouteErrorReason::from_tag(r.try_read(4)? as u8)?;
                MeshControl::RouteError { reason }
            },
            4 => {
                let parent = r.try_read(12)? as u16;
                let cost = r.try_read(8)? as u8;
                let count = r.try_read(8)? as usize;
                let _reserved = r.try_read(16)?;
                if count > NEIGHBOUR_REPORT_MAX {
                    return Err(CodecError::MeshReportTooLarge {
                        count,
                        max: NEIGHBOUR_REPORT_MAX,
                    });
                }
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let station = r.try_read(12)? as u16;
                    let rssi_q = r.try_read(4)? as u8;
                    let flags = r.try_read(4)? as u8;
                    let _reserved = r.try_read(4)?;
                    entries.push(NeighbourEntry { station, rssi_q, flags });
                }
                MeshControl::NeighbourReport { parent, cost, entries }
            },
            5 | 6 => {
                let _pad = r.try_read(4)?;
                let tag = r.try_read(16)? as u16;
                let _reserved = r.try_read(8)?;
                if ctrl == 5 { MeshControl::Ping { tag } } else { MeshControl::Pong { tag } }
            },
            other => return Err(CodecError::MeshControlUnknown(other)),
        };
        Ok(Self { sender: header.station, sequence: header.sequence, control })
    }

    fn control_type(&self) -> u8 {
        self.control.control_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_packing() {
        assert_eq!(pack_4_12(0x5, 0xABC), [0x5A, 0xBC]);
        assert_eq!(unpack_4_12([0x5A, 0xBC]), (0x5, 0xABC));
    }

    #[test]
    fn beacon_is_nine_bytes() {
        let pkt = MeshPacket {
            sender: 100,
            sequence: 9,
            control: MeshControl::Beacon { gateway: 1, cost: 2, flags: 0, generation: 4090 },
        };
        let wire = pkt.encode_to_vec().unwrap();
        assert_eq!(wire.len(), 9);
        assert_eq!(MeshPacket::decode(&wire).unwrap(), pkt);
    }

    #[test]
    fn forward_wraps_the_inner_packet_byte_aligned() {
        let inner = Bytes::from_static(&[0x00, 0x2A, 0x00, 0x01, 0x00]);
        let pkt = MeshPacket {
            sender: 7,
            sequence: 123,
            control: MeshControl::Forward { ttl: TTL_DEFAULT, inner: inner.clone() },
        };
        let wire = pkt.encode_to_vec().unwrap();
        assert_eq!(wire.len(), 6 + inner.len());
        assert_eq!(&wire[6..], &inner[..]);
        assert_eq!(MeshPacket::decode(&wire).unwrap(), pkt);
    }

    #[test]
    fn ack_route_error_and_probes_have_fixed_sizes() {
        let ack = MeshPacket {
            sender: 3,
            sequence: 1,
            control: MeshControl::Ack { station: 7, sequence: 123 },
        };
        assert_eq!(ack.encode_to_vec().unwrap().len(), 8);

        let err = MeshPacket {
            sender: 3,
            sequence: 2,
            control: MeshControl::RouteError { reason: RouteErrorReason::ParentLost },
        };
        assert_eq!(err.encode_to_vec().unwrap().len(), 5);

        let ping =
            MeshPacket { sender: 3, sequence: 3, control: MeshControl::Ping { tag: 0xBEEF } };
        let wire = ping.encode_to_vec().unwrap();
        assert_eq!(wire.len(), 8);
        assert_eq!(MeshPacket::decode(&wire).unwrap(), ping);
    }

    #[test]
    fn neighbour_report_is_ten_plus_three_per_entry() {
        let entries = vec![
            NeighbourEntry { station: 5, rssi_q: 12, flags: 1 },
            NeighbourEntry { station: 9, rssi_q: 3, flags: 0 },
        ];
        let pkt = MeshPacket {
            sender: 3,
            sequence: 4,
            control: MeshControl::NeighbourReport { parent: 1, cost: 2, entries },
        };
        let wire = pkt.encode_to_vec().unwrap();
        assert_eq!(wire.len(), 10 + 3 * 2);
        assert_eq!(MeshPacket::decode(&wire).unwrap(), pkt);
    }

    #[test]
    fn sensor_variant_is_not_a_mesh_packet() {
        let buf = [0x00, 0x2A, 0x00, 0x01, 0x00];
        assert_eq!(
            MeshPacket::decode(&buf),
            Err(CodecError::NotMeshVariant { variant: 0 })
        );
    }

    #[test]
    fn undefined_control_type_is_rejected() {
        let mut buf = [0u8; 6];
        buf[0] = 0xF0;
        buf[1] = 0x2A;
        buf[4] = 0x70; // control nibble 7
        assert_eq!(MeshPacket::decode(&buf), Err(CodecError::MeshControlUnknown(7)));
    }

    #[test]
    fn truncated_beacon_is_rejected() {
        let pkt = MeshPacket {
            sender: 100,
            sequence: 9,
            control: MeshControl::Beacon { gateway: 1, cost: 2, flags: 0, generation: 7 },
        };
        let wire = pkt.encode_to_vec().unwrap();
        assert!(matches!(
            MeshPacket::decode(&wire[..6]),
            Err(CodecError::Truncated { .. })
        ));
    }
}
