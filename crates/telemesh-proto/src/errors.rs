//! Error types for the Telemesh codec.
//!
//! One strongly-typed enum covers every failure the codec can surface:
//! encoder state misuse, buffer exhaustion, header validation, decode
//! truncation, per-field range violations, and the TLV/image sub-codecs.
//! The codec never logs and never panics on untrusted input; everything
//! comes back through these variants.

use thiserror::Error;

use crate::field::FieldKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, CodecError>;

/// All errors produced by the packet codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    // State errors
    /// A field setter was called twice for the same field type.
    #[error("duplicate field: {field} already set")]
    DuplicateField {
        /// Field type that was already present.
        field: FieldKind,
    },

    /// A field setter was called for a field the variant schema does not
    /// declare.
    #[error("field {field} is not declared by variant {variant}")]
    FieldNotInVariant {
        /// Field type that was rejected.
        field: FieldKind,
        /// Variant the encoder was begun with.
        variant: u8,
    },

    // Buffer errors
    /// The output buffer cannot hold the minimum header + presence bytes.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Minimum byte count required.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A bit write ran past the end of the output buffer.
    #[error("bit overflow: write of {nbits} bits at bit {cursor} exceeds {limit} bits")]
    BitOverflow {
        /// Bit cursor at the time of the write.
        cursor: usize,
        /// Width of the attempted write.
        nbits: usize,
        /// Buffer capacity in bits.
        limit: usize,
    },

    // Header errors
    /// Variant 15 is reserved for mesh control and never carries sensor data.
    #[error("variant 15 is reserved for mesh control")]
    VariantReserved,

    /// Variant id above the 4-bit maximum.
    #[error("variant {0} above maximum 15")]
    VariantTooHigh(u8),

    /// No schema is registered for this variant.
    #[error("variant {0} has no registered schema")]
    VariantUnknown(u8),

    /// Station 0 is the reserved "unassigned" sentinel.
    #[error("station 0 is reserved")]
    StationReserved,

    /// Station id above the 12-bit maximum.
    #[error("station {0} above maximum 4095")]
    StationTooHigh(u16),

    // Decode errors
    /// Buffer shorter than the fixed header.
    #[error("packet too short: {len} bytes, need at least {needed}")]
    DecodeShort {
        /// Bytes supplied.
        len: usize,
        /// Minimum bytes required.
        needed: usize,
    },

    /// A field or body unpack ran out of bits.
    #[error("packet truncated: needed {needed} more bits, {available} available")]
    Truncated {
        /// Bits the unpack required.
        needed: usize,
        /// Bits that remained.
        available: usize,
    },

    /// The presence chain did not terminate within the supported length.
    #[error("presence chain exceeds {max} bytes")]
    PresenceOverflow {
        /// Maximum chained presence bytes supported.
        max: usize,
    },

    /// A presence bit was set at a position the variant schema does not
    /// declare. Unknown fields are rejected, never skipped.
    #[error("presence bit set at undeclared position {position}")]
    UnknownFieldBit {
        /// Zero-based schema position of the offending bit.
        position: u8,
    },

    // Field range errors
    /// A physical value fell below the field's declared minimum.
    #[error("{field} below minimum: {value} < {min} (scaled units)")]
    RangeLow {
        /// Field (or sub-field) name.
        field: &'static str,
        /// Offending value in the field's scaled units.
        value: i64,
        /// Declared minimum, same units.
        min: i64,
    },

    /// A physical value exceeded the field's declared maximum.
    #[error("{field} above maximum: {value} > {max} (scaled units)")]
    RangeHigh {
        /// Field (or sub-field) name.
        field: &'static str,
        /// Offending value in the field's scaled units.
        value: i64,
        /// Declared maximum, same units.
        max: i64,
    },

    // TLV errors
    /// TLV type tag above the 6-bit maximum.
    #[error("tlv type {0} above maximum 63")]
    TlvTypeTooHigh(u8),

    /// TLV payload longer than the 8-bit length field can express.
    #[error("tlv data too long: {len} units, maximum 255")]
    TlvTooLong {
        /// Byte count (raw) or character count (string).
        len: usize,
    },

    /// The packet already carries the maximum number of TLV entries.
    #[error("tlv list full: capacity {capacity}")]
    TlvFull {
        /// Fixed per-packet TLV capacity.
        capacity: usize,
    },

    /// A string character is outside the 6-bit alphabet.
    #[error("character {ch:?} outside the 6-bit tlv alphabet")]
    TlvBadChar {
        /// Offending character.
        ch: char,
    },

    /// A decoded 6-bit code has no character assigned (63 is reserved).
    #[error("6-bit code {0} is reserved")]
    TlvBadCode(u8),

    /// An undefined TLV format tag was seen on the wire.
    #[error("tlv format tag {0} is not defined")]
    TlvFormatUnknown(u8),

    /// Key/value TLV helpers require an even, non-zero count of strings.
    #[error("tlv key/value list must hold an even, non-zero count of strings")]
    TlvKeyValueCount,

    /// Key/value TLV helpers reject empty keys and empty values.
    #[error("tlv key/value strings must be non-empty")]
    TlvKeyValueEmpty,

    // Image errors
    /// Pixel format tag above 2.
    #[error("image pixel format tag {0} above maximum 2")]
    ImageFormat(u8),

    /// Size tier tag above 3.
    #[error("image size tier tag {0} above maximum 3")]
    ImageSizeTier(u8),

    /// Compression tag above 2.
    #[error("image compression tag {0} above maximum 2")]
    ImageCompression(u8),

    /// Image flags occupy two bits.
    #[error("image flags {0} above maximum 3")]
    ImageFlags(u8),

    /// Image payload exceeds the length-prefix budget (254 bytes).
    #[error("image payload too long: {len} bytes, maximum 254")]
    ImageTooLong {
        /// Payload byte count.
        len: usize,
    },

    /// A back-reference named bytes before the start of decoder output.
    #[error("image back-reference distance {distance} exceeds {produced} produced bytes")]
    ImageBadBackref {
        /// Back-reference distance.
        distance: usize,
        /// Bytes produced so far.
        produced: usize,
    },

    /// Pixel data does not match the size tier.
    #[error("image pixel data size {actual}, size tier expects {expected}")]
    ImagePixelCount {
        /// Size the tier requires (bytes of packed input, or pixels).
        expected: usize,
        /// Size actually produced or supplied.
        actual: usize,
    },

    /// An image field whose length prefix leaves no room for the
    /// control byte.
    #[error("image field carries no control byte")]
    ImageEmpty,

    /// Decompression produced more data than the declared bound.
    #[error("image decompression exceeded {max} bytes")]
    ImageOverflow {
        /// Output bound.
        max: usize,
    },

    // Mesh codec errors
    /// A mesh decode was attempted on a packet that is not variant 15.
    #[error("variant {variant} is not a mesh control packet")]
    NotMeshVariant {
        /// Variant actually present in the header.
        variant: u8,
    },

    /// Control type nibble above the defined range.
    #[error("mesh control type {0} is not defined")]
    MeshControlUnknown(u8),

    /// Route error reason code above the defined range.
    #[error("route error reason {0} is not defined")]
    MeshReasonUnknown(u8),

    /// Neighbour report entry count above the table limit.
    #[error("neighbour report carries {count} entries, maximum {max}")]
    MeshReportTooLarge {
        /// Entries in the offending report.
        count: usize,
        /// Per-report entry limit.
        max: usize,
    },

    /// A FORWARD body must wrap at least one complete packet header.
    #[error("forwarded inner packet is {len} bytes, need at least {needed}")]
    MeshInnerTooShort {
        /// Inner byte count.
        len: usize,
        /// Minimum inner byte count.
        needed: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_stable() {
        insta::assert_snapshot!(
            CodecError::DuplicateField { field: FieldKind::Battery }.to_string(),
            @"duplicate field: battery already set"
        );
        insta::assert_snapshot!(CodecError::VariantReserved.to_string(),
            @"variant 15 is reserved for mesh control");
        insta::assert_snapshot!(
            CodecError::RangeHigh { field: "temperature", value: 8025, max: 8000 }.to_string(),
            @"temperature above maximum: 8025 > 8000 (scaled units)"
        );
        insta::assert_snapshot!(
            CodecError::Truncated { needed: 24, available: 7 }.to_string(),
            @"packet truncated: needed 24 more bits, 7 available"
        );
        insta::assert_snapshot!(
            CodecError::TlvFull { capacity: 8 }.to_string(),
            @"tlv list full: capacity 8"
        );
    }
}
