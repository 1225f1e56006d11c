//! MSB-first bit stream primitives.
//!
//! Everything on the Telemesh wire is packed below byte granularity, so
//! both codec directions run over these two cursors. Bit 0 is the most
//! significant bit of byte 0; a value's high bit is written first.
//!
//! Writes are hard-bounded: exceeding the buffer is an error and the
//! buffer is left unchanged past the cursor. Reads are soft-bounded per
//! the wire contract: an overrun returns the bits that were available
//! and clamps the cursor, and callers detect truncation by comparing
//! the cursor against the limit ([`BitReader::try_read`] wraps that
//! check for the common case).

use crate::errors::{CodecError, Result};

/// Bytes needed to hold `bits` bits.
#[must_use]
pub const fn bits_to_bytes(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Bounded MSB-first bit writer over a caller-supplied buffer.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buf: &'a mut [u8],
    limit_bits: usize,
    cursor: usize,
}

impl<'a> BitWriter<'a> {
    /// Wrap `buf`, starting at bit 0 with a limit of `buf.len() * 8` bits.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let limit_bits = buf.len() * 8;
        Self { buf, limit_bits, cursor: 0 }
    }

    /// Current bit cursor.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes touched so far (cursor rounded up to a byte boundary).
    #[must_use]
    pub fn byte_len(&self) -> usize {
        bits_to_bytes(self.cursor)
    }

    /// Store the low `nbits` of `value` at the cursor, MSB first.
    ///
    /// # Errors
    ///
    /// `CodecError::BitOverflow` when the write would pass the buffer
    /// end; the buffer and cursor are unchanged in that case.
    pub fn write(&mut self, value: u64, nbits: usize) -> Result<()> {
        debug_assert!(nbits <= 64);
        if self.cursor + nbits > self.limit_bits {
            return Err(CodecError::BitOverflow {
                cursor: self.cursor,
                nbits,
                limit: self.limit_bits,
            });
        }

        let mut remaining = nbits;
        while remaining > 0 {
            let byte = self.cursor / 8;
            let bit_in_byte = self.cursor % 8;

            // Byte-aligned fast path
            if bit_in_byte == 0 && remaining >= 8 {
                self.buf[byte] = ((value >> (remaining - 8)) & 0xFF) as u8;
                self.cursor += 8;
                remaining -= 8;
                continue;
            }

            let take = (8 - bit_in_byte).min(remaining);
            let chunk = ((value >> (remaining - take)) & ((1u64 << take) - 1)) as u8;
            let shift = 8 - bit_in_byte - take;
            let mask = (((1u16 << take) - 1) as u8) << shift;
            self.buf[byte] = (self.buf[byte] & !mask) | (chunk << shift);
            self.cursor += take;
            remaining -= take;
        }
        Ok(())
    }

    /// Append whole bytes at the cursor.
    ///
    /// # Errors
    ///
    /// `CodecError::BitOverflow` when the bytes do not fit.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.write(u64::from(b), 8)?;
        }
        Ok(())
    }
}

/// Bounded MSB-first bit reader.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buf: &'a [u8],
    limit_bits: usize,
    cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Wrap `buf`, starting at bit 0 with a limit of `buf.len() * 8` bits.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        let limit_bits = buf.len() * 8;
        Self { buf, limit_bits, cursor: 0 }
    }

    /// Current bit cursor.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bits left before the limit.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit_bits - self.cursor
    }

    /// Read `nbits` bits, MSB first, best effort.
    ///
    /// On overrun the available bits come back right-aligned and the
    /// cursor clamps to the limit; compare [`Self::position`] against
    /// the limit to detect the truncation.
    pub fn read(&mut self, nbits: usize) -> u64 {
        debug_assert!(nbits <= 64);
        let take_total = nbits.min(self.remaining());
        let mut value = 0u64;
        let mut taken = 0usize;
        while taken < take_total {
            let byte = self.cursor / 8;
            let bit_in_byte = self.cursor % 8;

            // Byte-aligned fast path
            if bit_in_byte == 0 && take_total - taken >= 8 {
                value = (value << 8) | u64::from(self.buf[byte]);
                self.cursor += 8;
                taken += 8;
                continue;
            }

            let take = (8 - bit_in_byte).min(take_total - taken);
            let shift = 8 - bit_in_byte - take;
            let chunk = (self.buf[byte] >> shift) & (((1u16 << take) - 1) as u8);
            value = (value << take) | u64::from(chunk);
            self.cursor += take;
            taken += take;
        }
        value
    }

    /// Read exactly `nbits` bits or fail.
    ///
    /// # Errors
    ///
    /// `CodecError::Truncated` when fewer than `nbits` bits remain; the
    /// cursor is unchanged in that case.
    pub fn try_read(&mut self, nbits: usize) -> Result<u64> {
        if nbits > self.remaining() {
            return Err(CodecError::Truncated { needed: nbits, available: self.remaining() });
        }
        Ok(self.read(nbits))
    }

    /// Read `count` whole bytes or fail.
    ///
    /// # Errors
    ///
    /// `CodecError::Truncated` when fewer than `count * 8` bits remain.
    pub fn try_read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        if count * 8 > self.remaining() {
            return Err(CodecError::Truncated { needed: count * 8, available: self.remaining() });
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read(8) as u8);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bits_round_to_bytes() {
        assert_eq!(bits_to_bytes(0), 0);
        assert_eq!(bits_to_bytes(1), 1);
        assert_eq!(bits_to_bytes(8), 1);
        assert_eq!(bits_to_bytes(9), 2);
        assert_eq!(bits_to_bytes(70), 9);
    }

    #[test]
    fn msb_first_layout() {
        let mut buf = [0u8; 2];
        let mut w = BitWriter::new(&mut buf);
        w.write(0b101, 3).unwrap();
        w.write(0b0_0001, 5).unwrap();
        w.write(0xAB, 8).unwrap();
        assert_eq!(buf, [0b1010_0001, 0xAB]);
    }

    #[test]
    fn write_past_end_is_rejected_and_harmless() {
        let mut buf = [0u8; 1];
        let mut w = BitWriter::new(&mut buf);
        w.write(0x3, 6).unwrap();
        let err = w.write(0x7, 3).unwrap_err();
        assert_eq!(err, CodecError::BitOverflow { cursor: 6, nbits: 3, limit: 8 });
        assert_eq!(w.position(), 6);
    }

    #[test]
    fn read_overrun_clamps_cursor() {
        let buf = [0xFF];
        let mut r = BitReader::new(&buf);
        let v = r.read(12);
        assert_eq!(v, 0xFF);
        assert_eq!(r.position(), 8);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn try_read_preserves_cursor_on_truncation() {
        let buf = [0xAA];
        let mut r = BitReader::new(&buf);
        r.try_read(4).unwrap();
        assert_eq!(r.try_read(8), Err(CodecError::Truncated { needed: 8, available: 4 }));
        assert_eq!(r.position(), 4);
    }

    proptest! {
        #[test]
        fn write_read_round_trip(values in prop::collection::vec((any::<u64>(), 1usize..=32), 1..24)) {
            let total: usize = values.iter().map(|(_, n)| n).sum();
            let mut buf = vec![0u8; bits_to_bytes(total)];
            let mut w = BitWriter::new(&mut buf);
            for &(v, n) in &values {
                w.write(v, n).unwrap();
            }
            prop_assert_eq!(w.position(), total);

            let mut r = BitReader::new(&buf);
            for &(v, n) in &values {
                let expect = if n == 64 { v } else { v & ((1u64 << n) - 1) };
                prop_assert_eq!(r.try_read(n).unwrap(), expect);
            }
        }

        #[test]
        fn aligned_bytes_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let mut buf = vec![0u8; bytes.len()];
            let mut w = BitWriter::new(&mut buf);
            w.write_bytes(&bytes).unwrap();
            prop_assert_eq!(&buf, &bytes);

            let mut r = BitReader::new(&buf);
            prop_assert_eq!(r.try_read_bytes(bytes.len()).unwrap(), bytes);
        }
    }
}
