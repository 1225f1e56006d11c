//! Packet decoder.
//!
//! Single-shot: [`Packet::decode`] validates the header, walks the
//! chained presence bytes, unpacks each present field in schema order,
//! and drains the TLV tail. All validation happens before any variable
//! payload is copied; variable payloads are copied into owned buffers
//! so the decoded packet does not borrow the input.
//!
//! Unknown presence positions are rejected rather than skipped: a
//! schema this decoder does not know cannot be round-tripped safely,
//! and silently dropping bits would corrupt everything after them.

use bytes::Bytes;

use crate::{
    bitstream::{BitReader, bits_to_bytes},
    encoder::{Encoder, MIN_PACKET_BYTES},
    errors::{CodecError, Result},
    field::{FieldKind, FieldSet},
    header::PacketHeader,
    image::{Image, ImageControl, ImageRef},
    schema::{self, MAX_PRESENCE_BYTES},
    tlv::{Tlv, TlvData, TlvRef, TlvValue, unpack_chain},
};

/// One decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    /// Packet header.
    pub header: PacketHeader,
    /// Fixed-width field slots; `None` where the presence bit was clear.
    pub fields: FieldSet,
    /// Image field, when present.
    pub image: Option<Image>,
    /// TLV tail, empty when the tlv bit was clear.
    pub tlvs: Vec<Tlv>,
    pres_bytes: usize,
    wire_bits: usize,
    wire_bytes: usize,
}

impl Packet {
    /// Header-only read for routing, without decoding the body.
    ///
    /// # Errors
    ///
    /// `DecodeShort` when fewer than four bytes are supplied.
    pub fn peek(bytes: &[u8]) -> Result<PacketHeader> {
        PacketHeader::peek(bytes)
    }

    /// Decode a sensor packet.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_PACKET_BYTES {
            return Err(CodecError::DecodeShort { len: bytes.len(), needed: MIN_PACKET_BYTES });
        }
        let mut r = BitReader::new(bytes);
        let header = PacketHeader::unpack(&mut r)?;
        if header.variant == schema::MESH_VARIANT {
            return Err(CodecError::VariantReserved);
        }
        PacketHeader::check_station(header.station)?;

        // Chained presence bytes: collected before the schema lookup so
        // a bad chain is reported as such even for unknown variants.
        let mut present = Vec::new();
        let mut tlv_present = false;
        let mut chain_len = 0usize;
        loop {
            let ext = r.try_read(1)? != 0;
            if chain_len == 0 {
                tlv_present = r.try_read(1)? != 0;
            }
            let count = if chain_len == 0 { 6 } else { 7 };
            for _ in 0..count {
                present.push(r.try_read(1)? != 0);
            }
            chain_len += 1;
            if !ext {
                break;
            }
            if chain_len >= MAX_PRESENCE_BYTES {
                return Err(CodecError::PresenceOverflow { max: MAX_PRESENCE_BYTES });
            }
        }

        let schema = schema::variant_schema(header.variant)
            .ok_or(CodecError::VariantUnknown(header.variant))?;

        let mut fields = FieldSet::default();
        let mut image = None;
        for (position, set) in present.iter().enumerate() {
            if !set {
                continue;
            }
            let Some(&kind) = schema.fields.get(position) else {
                return Err(CodecError::UnknownFieldBit { position: position as u8 });
            };
            if kind == FieldKind::Image {
                let len = r.try_read(8)? as usize;
                if len == 0 {
                    return Err(CodecError::ImageEmpty);
                }
                let control = ImageControl::from_byte(r.try_read(8)? as u8)?;
                let payload = Bytes::from(r.try_read_bytes(len - 1)?);
                image = Some(Image { control, payload });
            } else {
                fields.unpack(kind, &mut r)?;
            }
        }

        let tlvs = if tlv_present { unpack_chain(&mut r)? } else { Vec::new() };

        let wire_bits = r.position();
        Ok(Self {
            header,
            fields,
            image,
            tlvs,
            pres_bytes: chain_len,
            wire_bits,
            wire_bytes: bits_to_bytes(wire_bits),
        })
    }

    /// Final bit cursor after the body.
    #[must_use]
    pub fn wire_bits(&self) -> usize {
        self.wire_bits
    }

    /// Packet length in whole bytes.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.wire_bytes
    }

    /// Re-emit this packet.
    ///
    /// Raw quantized values survive decoding, so the output is
    /// byte-identical to the buffer this packet was decoded from.
    pub fn reencode(&self, buf: &mut [u8]) -> Result<usize> {
        let schema = schema::variant_schema(self.header.variant)
            .ok_or(CodecError::VariantUnknown(self.header.variant))?;
        if buf.len() < MIN_PACKET_BYTES {
            return Err(CodecError::BufferTooSmall {
                needed: MIN_PACKET_BYTES,
                available: buf.len(),
            });
        }
        let image = match &self.image {
            Some(img) => Some(ImageRef::new(img.control, &img.payload)?),
            None => None,
        };
        let tlvs = self
            .tlvs
            .iter()
            .map(|t| TlvRef {
                ty: t.ty,
                data: match &t.value {
                    TlvValue::Raw(bytes) => TlvData::Raw(bytes),
                    TlvValue::Text(s) => TlvData::Text(s),
                },
            })
            .collect();
        Encoder::restore(buf, self.header, schema, self.fields.clone(), image, tlvs)
            .with_presence_bytes(self.pres_bytes)
            .end()
    }
}
