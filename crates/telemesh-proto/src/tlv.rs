//! TLV sub-codec: chained type/length/value entries after the fixed
//! fields.
//!
//! Each entry carries a 17-bit header `format(2) | type(6) | more(1) |
//! length(8)` followed by the payload. Raw entries count bytes; string
//! entries count characters, each packed into 6 bits over the alphabet
//! space, `a`-`z`, `0`-`9`, `A`-`Z` (code 63 is reserved). The `more`
//! bit chains entries; a packet holds at most [`TLV_CAPACITY`] of them.

use bytes::Bytes;

use crate::{
    bitstream::{BitReader, BitWriter},
    errors::{CodecError, Result},
};

/// Maximum TLV entries per packet.
pub const TLV_CAPACITY: usize = 8;

/// Highest type tag expressible in 6 bits.
pub const TLV_MAX_TYPE: u8 = 63;

/// Longest payload the 8-bit length field can carry (bytes or chars).
pub const TLV_MAX_LEN: usize = 255;

/// Well-known TLV type assignments.
pub mod types {
    /// Firmware/protocol version string.
    pub const VERSION: u8 = 0x00;
    /// Device status word.
    pub const STATUS: u8 = 0x01;
    /// Health/self-test report.
    pub const HEALTH: u8 = 0x02;
    /// Configuration echo.
    pub const CONFIG: u8 = 0x03;
    /// Diagnostic payload.
    pub const DIAGNOSTIC: u8 = 0x04;
    /// Opaque user data.
    pub const USER_DATA: u8 = 0x05;
    /// Last type in the global well-known range.
    pub const GLOBAL_MAX: u8 = 0x0F;
    /// First type in the quality/metadata range.
    pub const QUALITY_BASE: u8 = 0x10;
    /// First type free for application use.
    pub const APPLICATION_BASE: u8 = 0x20;
}

/// Payload format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TlvFormat {
    /// Opaque bytes, 8 bits per unit.
    Raw = 0,
    /// 6-bit packed text.
    String6 = 1,
}

impl TlvFormat {
    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(TlvFormat::Raw),
            1 => Ok(TlvFormat::String6),
            other => Err(CodecError::TlvFormatUnknown(other)),
        }
    }
}

/// One decoded TLV entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tlv {
    /// 6-bit type tag.
    pub ty: u8,
    /// Decoded payload.
    pub value: TlvValue,
}

/// Decoded TLV payload, owned by the packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TlvValue {
    /// Raw bytes.
    Raw(Bytes),
    /// Text over the 6-bit alphabet.
    Text(String),
}

/// Map a character into the 6-bit alphabet.
#[must_use]
pub fn sixbit_encode(ch: char) -> Option<u8> {
    match ch {
        ' ' => Some(0),
        'a'..='z' => Some(1 + (ch as u8 - b'a')),
        '0'..='9' => Some(27 + (ch as u8 - b'0')),
        'A'..='Z' => Some(37 + (ch as u8 - b'A')),
        _ => None,
    }
}

/// Map a 6-bit code back to its character. Code 63 is reserved.
#[must_use]
pub fn sixbit_decode(code: u8) -> Option<char> {
    match code {
        0 => Some(' '),
        1..=26 => Some((b'a' + code - 1) as char),
        27..=36 => Some((b'0' + code - 27) as char),
        37..=62 => Some((b'A' + code - 37) as char),
        _ => None,
    }
}

/// Validate that every character of `s` is in the 6-bit alphabet.
pub fn sixbit_check(s: &str) -> Result<()> {
    match s.chars().find(|&ch| sixbit_encode(ch).is_none()) {
        Some(ch) => Err(CodecError::TlvBadChar { ch }),
        None => Ok(()),
    }
}

/// Join key/value strings with single spaces for a key/value TLV.
///
/// # Errors
///
/// `TlvKeyValueCount` for an odd or zero count, `TlvKeyValueEmpty` for
/// any empty string, `TlvBadChar` for characters outside the alphabet.
pub fn join_kv(pairs: &[&str]) -> Result<String> {
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CodecError::TlvKeyValueCount);
    }
    for s in pairs {
        if s.is_empty() {
            return Err(CodecError::TlvKeyValueEmpty);
        }
        sixbit_check(s)?;
    }
    Ok(pairs.join(" "))
}

/// Pending entry on the encode side; payloads stay borrowed except for
/// helper-built strings.
#[derive(Debug, Clone)]
pub(crate) enum TlvData<'a> {
    Raw(&'a [u8]),
    Text(&'a str),
    TextOwned(String),
}

#[derive(Debug, Clone)]
pub(crate) struct TlvRef<'a> {
    pub ty: u8,
    pub data: TlvData<'a>,
}

impl TlvRef<'_> {
    fn text(&self) -> Option<&str> {
        match &self.data {
            TlvData::Raw(_) => None,
            TlvData::Text(s) => Some(s),
            TlvData::TextOwned(s) => Some(s),
        }
    }

    /// Wire cost including the 17-bit header.
    #[allow(dead_code)]
    pub fn wire_bits(&self) -> usize {
        17 + match &self.data {
            TlvData::Raw(bytes) => bytes.len() * 8,
            TlvData::Text(s) => s.chars().count() * 6,
            TlvData::TextOwned(s) => s.chars().count() * 6,
        }
    }

    /// Emit one entry at the writer cursor.
    pub fn pack(&self, more: bool, w: &mut BitWriter<'_>) -> Result<()> {
        match &self.data {
            TlvData::Raw(bytes) => {
                w.write(u64::from(TlvFormat::Raw as u8), 2)?;
                w.write(u64::from(self.ty), 6)?;
                w.write(u64::from(more), 1)?;
                w.write(bytes.len() as u64, 8)?;
                w.write_bytes(bytes)?;
            },
            TlvData::Text(_) | TlvData::TextOwned(_) => {
                // Validated at push time; absence here is a state bug.
                let s = self.text().unwrap_or("");
                w.write(u64::from(TlvFormat::String6 as u8), 2)?;
                w.write(u64::from(self.ty), 6)?;
                w.write(u64::from(more), 1)?;
                w.write(s.chars().count() as u64, 8)?;
                for ch in s.chars() {
                    let code = sixbit_encode(ch).ok_or(CodecError::TlvBadChar { ch })?;
                    w.write(u64::from(code), 6)?;
                }
            },
        }
        Ok(())
    }
}

/// Validate an entry before it joins the pending list.
pub(crate) fn check_entry(ty: u8, len: usize, pending: usize) -> Result<()> {
    if pending >= TLV_CAPACITY {
        return Err(CodecError::TlvFull { capacity: TLV_CAPACITY });
    }
    if ty > TLV_MAX_TYPE {
        return Err(CodecError::TlvTypeTooHigh(ty));
    }
    if len > TLV_MAX_LEN {
        return Err(CodecError::TlvTooLong { len });
    }
    Ok(())
}

/// Decode a TLV chain at the reader cursor.
///
/// Entries are read until a clear `more` bit. A chain that is still
/// continuing past [`TLV_CAPACITY`] entries is rejected rather than
/// silently clipped, so re-encoding a decoded packet cannot lose data.
pub(crate) fn unpack_chain(r: &mut BitReader<'_>) -> Result<Vec<Tlv>> {
    let mut entries = Vec::new();
    loop {
        if entries.len() >= TLV_CAPACITY {
            return Err(CodecError::TlvFull { capacity: TLV_CAPACITY });
        }
        let format = TlvFormat::from_tag(r.try_read(2)? as u8)?;
        let ty = r.try_read(6)? as u8;
        let more = r.try_read(1)? != 0;
        let len = r.try_read(8)? as usize;
        let value = match format {
            TlvFormat::Raw => TlvValue::Raw(Bytes::from(r.try_read_bytes(len)?)),
            TlvFormat::String6 => {
                let mut s = String::with_capacity(len);
                for _ in 0..len {
                    let code = r.try_read(6)? as u8;
                    s.push(sixbit_decode(code).ok_or(CodecError::TlvBadCode(code))?);
                }
                TlvValue::Text(s)
            },
        };
        entries.push(Tlv { ty, value });
        if !more {
            return Ok(entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn alphabet_is_total_and_reserved_code_rejected() {
        for code in 0..=62u8 {
            let ch = sixbit_decode(code).unwrap();
            assert_eq!(sixbit_encode(ch), Some(code));
        }
        assert_eq!(sixbit_decode(63), None);
        assert_eq!(sixbit_encode('!'), None);
        assert_eq!(sixbit_encode('_'), None);
    }

    #[test]
    fn kv_join_rules() {
        assert_eq!(join_kv(&["fw", "1 2"]).unwrap(), "fw 1 2");
        assert_eq!(join_kv(&["a"]), Err(CodecError::TlvKeyValueCount));
        assert_eq!(join_kv(&[]), Err(CodecError::TlvKeyValueCount));
        assert_eq!(join_kv(&["k", ""]), Err(CodecError::TlvKeyValueEmpty));
        assert_eq!(join_kv(&["k", "v!"]), Err(CodecError::TlvBadChar { ch: '!' }));
    }

    #[test]
    fn entry_checks() {
        assert!(check_entry(0x20, 4, 0).is_ok());
        assert_eq!(check_entry(64, 0, 0), Err(CodecError::TlvTypeTooHigh(64)));
        assert_eq!(check_entry(0, 256, 0), Err(CodecError::TlvTooLong { len: 256 }));
        assert_eq!(check_entry(0, 0, TLV_CAPACITY), Err(CodecError::TlvFull { capacity: 8 }));
    }

    #[test]
    fn chain_round_trip() {
        let entries = [
            TlvRef { ty: 0x20, data: TlvData::Raw(&[0xDE, 0xAD, 0xBE, 0xEF]) },
            TlvRef { ty: 0x21, data: TlvData::Text("HELLO") },
            TlvRef { ty: 0x22, data: TlvData::Raw(&[0x7F]) },
        ];
        let mut buf = [0u8; 32];
        let mut w = BitWriter::new(&mut buf);
        for (i, e) in entries.iter().enumerate() {
            e.pack(i + 1 < entries.len(), &mut w).unwrap();
        }
        let bits = w.position();

        let mut r = BitReader::new(&buf);
        let decoded = unpack_chain(&mut r).unwrap();
        assert_eq!(r.position(), bits);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].ty, 0x20);
        assert_eq!(decoded[0].value, TlvValue::Raw(Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF])));
        assert_eq!(decoded[1].value, TlvValue::Text("HELLO".into()));
        assert_eq!(decoded[2].value, TlvValue::Raw(Bytes::from_static(&[0x7F])));
    }

    #[test]
    fn truncated_chain_is_an_error() {
        // Header claims 4 raw bytes but only 1 follows.
        let mut buf = [0u8; 4];
        let mut w = BitWriter::new(&mut buf);
        w.write(0, 2).unwrap(); // format raw
        w.write(0x20, 6).unwrap();
        w.write(0, 1).unwrap(); // more = 0
        w.write(4, 8).unwrap(); // length 4
        w.write(0xAB, 8).unwrap();
        let mut r = BitReader::new(&buf[..3]);
        assert!(matches!(unpack_chain(&mut r), Err(CodecError::Truncated { .. })));
    }

    proptest! {
        #[test]
        fn text_round_trips(codes in prop::collection::vec(0u8..=62, 0..=64)) {
            let s: String = codes.iter().map(|&c| sixbit_decode(c).unwrap()).collect();
            let entry = TlvRef { ty: 1, data: TlvData::TextOwned(s.clone()) };
            let mut buf = vec![0u8; 4 + s.len()];
            let mut w = BitWriter::new(&mut buf);
            entry.pack(false, &mut w).unwrap();

            let mut r = BitReader::new(&buf);
            let decoded = unpack_chain(&mut r).unwrap();
            prop_assert_eq!(&decoded[0].value, &TlvValue::Text(s));
        }
    }
}
