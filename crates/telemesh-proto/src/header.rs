//! Packet header: `variant(4) | station(12) | sequence(16)`.
//!
//! The header is shared by sensor and mesh packets; validation of the
//! variant value is left to the layer that knows which space it is in
//! (the sensor decoder rejects the mesh variant, the mesh codec
//! requires it). Station 0 is the reserved "unassigned" sentinel and
//! is never emitted as a sender.

use crate::{
    bitstream::{BitReader, BitWriter},
    errors::{CodecError, Result},
    schema::MAX_STATION,
};

/// Wire size of the fixed header in bytes.
pub const HEADER_BYTES: usize = 4;

/// The four-byte packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketHeader {
    /// 4-bit schema id (15 = mesh control).
    pub variant: u8,
    /// 12-bit sender station id.
    pub station: u16,
    /// 16-bit free-running sequence number.
    pub sequence: u16,
}

impl PacketHeader {
    /// Validate the sender fields shared by sensor and mesh packets.
    ///
    /// # Errors
    ///
    /// `StationReserved` for station 0, `StationTooHigh` above 4095.
    pub fn check_station(station: u16) -> Result<()> {
        if station == 0 {
            return Err(CodecError::StationReserved);
        }
        if station > MAX_STATION {
            return Err(CodecError::StationTooHigh(station));
        }
        Ok(())
    }

    /// Write the header at the writer cursor.
    pub(crate) fn pack(&self, w: &mut BitWriter<'_>) -> Result<()> {
        w.write(u64::from(self.variant), 4)?;
        w.write(u64::from(self.station), 12)?;
        w.write(u64::from(self.sequence), 16)?;
        Ok(())
    }

    /// Read a header at the reader cursor.
    pub(crate) fn unpack(r: &mut BitReader<'_>) -> Result<Self> {
        let variant = r.try_read(4)? as u8;
        let station = r.try_read(12)? as u16;
        let sequence = r.try_read(16)? as u16;
        Ok(Self { variant, station, sequence })
    }

    /// Header-only read of a buffer, without touching the body.
    ///
    /// This is the routing peek: mesh forwarders use it to learn a
    /// packet's origin without paying for a full decode.
    ///
    /// # Errors
    ///
    /// `DecodeShort` when fewer than four bytes are supplied.
    pub fn peek(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_BYTES {
            return Err(CodecError::DecodeShort { len: bytes.len(), needed: HEADER_BYTES });
        }
        let mut r = BitReader::new(bytes);
        Self::unpack(&mut r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = PacketHeader { variant: 0x3, station: 0xABC, sequence: 0x1234 };
        let mut buf = [0u8; 4];
        let mut w = BitWriter::new(&mut buf);
        header.pack(&mut w).unwrap();
        assert_eq!(buf, [0x3A, 0xBC, 0x12, 0x34]);
        assert_eq!(PacketHeader::peek(&buf).unwrap(), header);
    }

    #[test]
    fn peek_needs_four_bytes() {
        assert_eq!(
            PacketHeader::peek(&[0x00, 0x01, 0x02]),
            Err(CodecError::DecodeShort { len: 3, needed: 4 })
        );
    }

    #[test]
    fn station_bounds() {
        assert_eq!(PacketHeader::check_station(0), Err(CodecError::StationReserved));
        assert_eq!(PacketHeader::check_station(4096), Err(CodecError::StationTooHigh(4096)));
        assert!(PacketHeader::check_station(1).is_ok());
        assert!(PacketHeader::check_station(4095).is_ok());
    }
}
