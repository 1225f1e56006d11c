//! Packet encoder.
//!
//! Linear lifecycle: [`Encoder::begin`] validates the header inputs and
//! captures the output buffer, field setters stage quantized values in
//! any order, and [`Encoder::end`] consumes the encoder and emits
//! header, presence chain, fields in schema order, and the TLV tail.
//! A finished encoder cannot be reused; callers begin again.
//!
//! Setters are idempotence-checked: a duplicate field, or a field the
//! variant does not declare, is rejected without mutating state. Wire
//! order is fixed by the schema regardless of setter order, and a
//! declared-but-unset field contributes zero wire bits.

use crate::{
    bitstream::BitWriter,
    errors::{CodecError, Result},
    field::{
        AirQuality, Battery, CloudCover, Datetime, Depth, Environment, FieldKind, FieldSet, Flags,
        Humidity, Link, Position, Pressure, Radiation, Rain, Solar, Temperature, Wind,
    },
    header::PacketHeader,
    image::ImageRef,
    schema::{self, VariantSchema, presence_bytes_for},
    tlv::{self, TlvData, TlvRef},
};

/// Minimum output buffer: header plus one presence byte.
pub const MIN_PACKET_BYTES: usize = 5;

/// In-progress packet encoder over a borrowed output buffer.
#[derive(Debug)]
pub struct Encoder<'a> {
    buf: &'a mut [u8],
    header: PacketHeader,
    schema: &'static VariantSchema,
    fields: FieldSet,
    image: Option<ImageRef<'a>>,
    tlvs: Vec<TlvRef<'a>>,
    pres_override: Option<usize>,
}

impl<'a> Encoder<'a> {
    /// Start a packet.
    ///
    /// # Errors
    ///
    /// `VariantReserved` for variant 15, `VariantTooHigh` above that,
    /// `VariantUnknown` when no schema is registered,
    /// `StationReserved`/`StationTooHigh` for bad sender ids, and
    /// `BufferTooSmall` when `buf` cannot hold even an empty packet.
    pub fn begin(buf: &'a mut [u8], variant: u8, station: u16, sequence: u16) -> Result<Self> {
        if variant == schema::MESH_VARIANT {
            return Err(CodecError::VariantReserved);
        }
        if variant > schema::MESH_VARIANT {
            return Err(CodecError::VariantTooHigh(variant));
        }
        let schema =
            schema::variant_schema(variant).ok_or(CodecError::VariantUnknown(variant))?;
        PacketHeader::check_station(station)?;
        if buf.len() < MIN_PACKET_BYTES {
            return Err(CodecError::BufferTooSmall {
                needed: MIN_PACKET_BYTES,
                available: buf.len(),
            });
        }
        Ok(Self {
            buf,
            header: PacketHeader { variant, station, sequence },
            schema,
            fields: FieldSet::default(),
            image: None,
            tlvs: Vec::new(),
            pres_override: None,
        })
    }

    /// Header this encoder was begun with.
    #[must_use]
    pub fn header(&self) -> PacketHeader {
        self.header
    }

    fn check_field(&self, kind: FieldKind) -> Result<()> {
        if self.schema.position_of(kind).is_none() {
            return Err(CodecError::FieldNotInVariant { field: kind, variant: self.header.variant });
        }
        let present = match kind {
            FieldKind::Image => self.image.is_some(),
            _ => self.fields.contains(kind),
        };
        if present {
            return Err(CodecError::DuplicateField { field: kind });
        }
        Ok(())
    }

    /// Stage a battery reading.
    pub fn battery(&mut self, value: Battery) -> Result<()> {
        self.check_field(FieldKind::Battery)?;
        self.fields.battery = Some(value);
        Ok(())
    }

    /// Stage a link quality reading.
    pub fn link(&mut self, value: Link) -> Result<()> {
        self.check_field(FieldKind::Link)?;
        self.fields.link = Some(value);
        Ok(())
    }

    /// Stage a composite environment reading.
    pub fn environment(&mut self, value: Environment) -> Result<()> {
        self.check_field(FieldKind::Environment)?;
        self.fields.environment = Some(value);
        Ok(())
    }

    /// Stage a standalone temperature reading.
    pub fn temperature(&mut self, value: Temperature) -> Result<()> {
        self.check_field(FieldKind::Temperature)?;
        self.fields.temperature = Some(value);
        Ok(())
    }

    /// Stage a standalone pressure reading.
    pub fn pressure(&mut self, value: Pressure) -> Result<()> {
        self.check_field(FieldKind::Pressure)?;
        self.fields.pressure = Some(value);
        Ok(())
    }

    /// Stage a standalone humidity reading.
    pub fn humidity(&mut self, value: Humidity) -> Result<()> {
        self.check_field(FieldKind::Humidity)?;
        self.fields.humidity = Some(value);
        Ok(())
    }

    /// Stage a wind reading.
    pub fn wind(&mut self, value: Wind) -> Result<()> {
        self.check_field(FieldKind::Wind)?;
        self.fields.wind = Some(value);
        Ok(())
    }

    /// Stage a rain reading.
    pub fn rain(&mut self, value: Rain) -> Result<()> {
        self.check_field(FieldKind::Rain)?;
        self.fields.rain = Some(value);
        Ok(())
    }

    /// Stage a solar reading.
    pub fn solar(&mut self, value: Solar) -> Result<()> {
        self.check_field(FieldKind::Solar)?;
        self.fields.solar = Some(value);
        Ok(())
    }

    /// Stage a cloud cover reading.
    pub fn cloud_cover(&mut self, value: CloudCover) -> Result<()> {
        self.check_field(FieldKind::CloudCover)?;
        self.fields.cloud_cover = Some(value);
        Ok(())
    }

    /// Stage an air quality reading.
    pub fn air_quality(&mut self, value: AirQuality) -> Result<()> {
        self.check_field(FieldKind::AirQuality)?;
        self.fields.air_quality = Some(value);
        Ok(())
    }

    /// Stage a radiation reading.
    pub fn radiation(&mut self, value: Radiation) -> Result<()> {
        self.check_field(FieldKind::Radiation)?;
        self.fields.radiation = Some(value);
        Ok(())
    }

    /// Stage a depth reading.
    pub fn depth(&mut self, value: Depth) -> Result<()> {
        self.check_field(FieldKind::Depth)?;
        self.fields.depth = Some(value);
        Ok(())
    }

    /// Stage a position fix.
    pub fn position(&mut self, value: Position) -> Result<()> {
        self.check_field(FieldKind::Position)?;
        self.fields.position = Some(value);
        Ok(())
    }

    /// Stage a timestamp.
    pub fn datetime(&mut self, value: Datetime) -> Result<()> {
        self.check_field(FieldKind::Datetime)?;
        self.fields.datetime = Some(value);
        Ok(())
    }

    /// Stage flag bits.
    pub fn flags(&mut self, value: Flags) -> Result<()> {
        self.check_field(FieldKind::Flags)?;
        self.fields.flags = Some(value);
        Ok(())
    }

    /// Stage an image field. The payload stays borrowed until
    /// [`Self::end`]; callers must not alias it in the meantime.
    pub fn image(&mut self, value: ImageRef<'a>) -> Result<()> {
        self.check_field(FieldKind::Image)?;
        self.image = Some(value);
        Ok(())
    }

    /// Append a raw TLV entry.
    pub fn tlv_raw(&mut self, ty: u8, data: &'a [u8]) -> Result<()> {
        tlv::check_entry(ty, data.len(), self.tlvs.len())?;
        self.tlvs.push(TlvRef { ty, data: TlvData::Raw(data) });
        Ok(())
    }

    /// Append a 6-bit string TLV entry.
    pub fn tlv_string(&mut self, ty: u8, text: &'a str) -> Result<()> {
        tlv::check_entry(ty, text.chars().count(), self.tlvs.len())?;
        tlv::sixbit_check(text)?;
        self.tlvs.push(TlvRef { ty, data: TlvData::Text(text) });
        Ok(())
    }

    /// Append a key/value string TLV: pairs joined with single spaces.
    pub fn tlv_string_kv(&mut self, ty: u8, pairs: &[&str]) -> Result<()> {
        let joined = tlv::join_kv(pairs)?;
        tlv::check_entry(ty, joined.chars().count(), self.tlvs.len())?;
        self.tlvs.push(TlvRef { ty, data: TlvData::TextOwned(joined) });
        Ok(())
    }

    /// Finish the packet, returning its wire length in bytes.
    ///
    /// # Errors
    ///
    /// `BitOverflow` when the staged packet does not fit the buffer;
    /// nothing useful remains in the buffer afterwards and the caller
    /// must begin again.
    pub fn end(self) -> Result<usize> {
        let Self { buf, header, schema, fields, image, tlvs, pres_override } = self;
        let is_set = |kind: FieldKind| -> bool {
            match kind {
                FieldKind::Image => image.is_some(),
                _ => fields.contains(kind),
            }
        };

        let mut max_position = None;
        for (pos, &kind) in schema.fields.iter().enumerate() {
            if is_set(kind) {
                max_position = Some(pos);
            }
        }
        let minimal = max_position.map_or(1, presence_bytes_for);
        // A decoded packet re-emits its original chain length even when
        // that chain was longer than the set fields require.
        let pres_bytes = pres_override.map_or(minimal, |n| n.max(minimal));

        let mut w = BitWriter::new(buf);
        header.pack(&mut w)?;

        // Presence chain: byte 0 is ext|tlv|F0..F5, extensions are
        // ext|F(n)..F(n+6).
        for byte_idx in 0..pres_bytes {
            let ext = byte_idx + 1 < pres_bytes;
            w.write(u64::from(ext), 1)?;
            let (first, count) = if byte_idx == 0 {
                w.write(u64::from(!tlvs.is_empty()), 1)?;
                (0, 6)
            } else {
                (6 + 7 * (byte_idx - 1), 7)
            };
            for pos in first..first + count {
                let set = schema.fields.get(pos).is_some_and(|&kind| is_set(kind));
                w.write(u64::from(set), 1)?;
            }
        }

        for &kind in schema.fields {
            if !is_set(kind) {
                continue;
            }
            if kind == FieldKind::Image {
                // Length counts the control byte plus the payload.
                if let Some(image) = &image {
                    w.write(image.payload.len() as u64 + 1, 8)?;
                    w.write(u64::from(image.control.to_byte()), 8)?;
                    w.write_bytes(image.payload)?;
                }
            } else {
                fields.pack(kind, &mut w)?;
            }
        }

        for (i, entry) in tlvs.iter().enumerate() {
            entry.pack(i + 1 < tlvs.len(), &mut w)?;
        }

        Ok(w.byte_len())
    }

    /// Rebuild an encoder from already-validated parts (re-encode path).
    pub(crate) fn restore(
        buf: &'a mut [u8],
        header: PacketHeader,
        schema: &'static VariantSchema,
        fields: FieldSet,
        image: Option<ImageRef<'a>>,
        tlvs: Vec<TlvRef<'a>>,
    ) -> Self {
        Self { buf, header, schema, fields, image, tlvs, pres_override: None }
    }

    /// Pin the presence-chain length (re-encode path).
    pub(crate) fn with_presence_bytes(mut self, pres_bytes: usize) -> Self {
        self.pres_override = Some(pres_bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_validates_the_header_inputs() {
        let mut buf = [0u8; 16];
        assert_eq!(
            Encoder::begin(&mut buf, 15, 1, 0).unwrap_err(),
            CodecError::VariantReserved
        );
        assert_eq!(
            Encoder::begin(&mut buf, 16, 1, 0).unwrap_err(),
            CodecError::VariantTooHigh(16)
        );
        assert_eq!(
            Encoder::begin(&mut buf, 9, 1, 0).unwrap_err(),
            CodecError::VariantUnknown(9)
        );
        assert_eq!(
            Encoder::begin(&mut buf, 0, 0, 0).unwrap_err(),
            CodecError::StationReserved
        );
        let mut small = [0u8; 4];
        assert_eq!(
            Encoder::begin(&mut small, 0, 1, 0).unwrap_err(),
            CodecError::BufferTooSmall { needed: 5, available: 4 }
        );
    }

    #[test]
    fn duplicate_and_undeclared_fields_are_rejected() {
        let mut buf = [0u8; 32];
        let mut enc = Encoder::begin(&mut buf, 0, 42, 1).unwrap();
        enc.battery(Battery::new(50, true).unwrap()).unwrap();
        assert_eq!(
            enc.battery(Battery::new(55, true).unwrap()).unwrap_err(),
            CodecError::DuplicateField { field: FieldKind::Battery }
        );
        // weather_station declares the composite, not the standalone form
        assert_eq!(
            enc.temperature(Temperature::new_scaled(0).unwrap()).unwrap_err(),
            CodecError::FieldNotInVariant { field: FieldKind::Temperature, variant: 0 }
        );
    }

    #[test]
    fn empty_packet_is_five_bytes() {
        let mut buf = [0u8; 8];
        let enc = Encoder::begin(&mut buf, 0, 42, 7).unwrap();
        let len = enc.end().unwrap();
        assert_eq!(len, 5);
        assert_eq!(&buf[..5], &[0x00, 0x2A, 0x00, 0x07, 0x00]);
    }

    #[test]
    fn battery_and_environment_pack_to_nine_bytes() {
        // Header + presence + 6 bits battery + 24 bits environment.
        let mut buf = [0u8; 16];
        let mut enc = Encoder::begin(&mut buf, 0, 42, 1).unwrap();
        enc.battery(Battery::new(75, false).unwrap()).unwrap();
        enc.environment(Environment::new_scaled(2150, 1013, 60).unwrap()).unwrap();
        let len = enc.end().unwrap();
        assert_eq!(len, 9);
        // presence byte: ext=0 tlv=0 F0=1 F1=0 F2=1 ...
        assert_eq!(buf[4], 0b0010_1000);
    }

    #[test]
    fn buffer_exhaustion_surfaces_as_overflow() {
        let mut buf = [0u8; 5];
        let mut enc = Encoder::begin(&mut buf, 0, 42, 1).unwrap();
        enc.environment(Environment::new_scaled(0, 1000, 50).unwrap()).unwrap();
        assert!(matches!(enc.end().unwrap_err(), CodecError::BitOverflow { .. }));
    }

    #[test]
    fn ninth_tlv_is_rejected() {
        let mut buf = [0u8; 64];
        let mut enc = Encoder::begin(&mut buf, 0, 42, 1).unwrap();
        let entries: Vec<[u8; 1]> = (0..8u8).map(|ty| [ty]).collect();
        for (ty, data) in (0..8u8).zip(entries.iter()) {
            enc.tlv_raw(0x20 + ty, data).unwrap();
        }
        assert_eq!(
            enc.tlv_raw(0x2F, &[9]).unwrap_err(),
            CodecError::TlvFull { capacity: 8 }
        );
    }
}
