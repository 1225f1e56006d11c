//! Image field sub-codec.
//!
//! Wire layout: `length(8) | control(8) | payload(length - 1 bytes)`.
//! The control byte is `pixel_format(2) | size_tier(2) | compression(2)
//! | flags(2)`. Payloads are raw packed pixels, RLE runs, or a
//! heatshrink-LZSS stream; whichever is used, it must fit the length
//! prefix (254 bytes), which is what makes compression mandatory for
//! the larger tiers.

mod heatshrink;
pub mod pixels;
mod rle;

use bytes::Bytes;

use crate::errors::{CodecError, Result};

/// Largest payload the length prefix can carry (255 minus the control
/// byte).
pub const IMAGE_MAX_PAYLOAD: usize = 254;

/// Pixel bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    /// 1 bit per pixel.
    Bilevel = 0,
    /// 2 bits per pixel.
    Grey4 = 1,
    /// 4 bits per pixel.
    Grey16 = 2,
}

impl PixelFormat {
    /// Bits per pixel.
    #[must_use]
    pub fn bpp(self) -> usize {
        match self {
            PixelFormat::Bilevel => 1,
            PixelFormat::Grey4 => 2,
            PixelFormat::Grey16 => 4,
        }
    }

    /// Decode the 2-bit tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(PixelFormat::Bilevel),
            1 => Ok(PixelFormat::Grey4),
            2 => Ok(PixelFormat::Grey16),
            other => Err(CodecError::ImageFormat(other)),
        }
    }
}

/// Image dimensions tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeTier {
    /// 24 x 18 pixels.
    T24x18 = 0,
    /// 32 x 24 pixels.
    T32x24 = 1,
    /// 48 x 36 pixels.
    T48x36 = 2,
    /// 64 x 48 pixels.
    T64x48 = 3,
}

impl SizeTier {
    /// Width and height in pixels.
    #[must_use]
    pub fn dims(self) -> (usize, usize) {
        match self {
            SizeTier::T24x18 => (24, 18),
            SizeTier::T32x24 => (32, 24),
            SizeTier::T48x36 => (48, 36),
            SizeTier::T64x48 => (64, 48),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> usize {
        let (w, h) = self.dims();
        w * h
    }

    /// Decode the 2-bit tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(SizeTier::T24x18),
            1 => Ok(SizeTier::T32x24),
            2 => Ok(SizeTier::T48x36),
            3 => Ok(SizeTier::T64x48),
            other => Err(CodecError::ImageSizeTier(other)),
        }
    }
}

/// Payload compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compression {
    /// Packed pixels verbatim.
    Raw = 0,
    /// Run-length runs.
    Rle = 1,
    /// Heatshrink LZSS stream.
    Heatshrink = 2,
}

impl Compression {
    /// Decode the 2-bit tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Compression::Raw),
            1 => Ok(Compression::Rle),
            2 => Ok(Compression::Heatshrink),
            other => Err(CodecError::ImageCompression(other)),
        }
    }
}

/// The image control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageControl {
    /// Pixel bit depth.
    pub format: PixelFormat,
    /// Dimensions tier.
    pub tier: SizeTier,
    /// Payload compression.
    pub compression: Compression,
    /// Two application flag bits.
    pub flags: u8,
}

impl ImageControl {
    /// Build a control record, validating the flag width.
    pub fn new(
        format: PixelFormat,
        tier: SizeTier,
        compression: Compression,
        flags: u8,
    ) -> Result<Self> {
        if flags > 3 {
            return Err(CodecError::ImageFlags(flags));
        }
        Ok(Self { format, tier, compression, flags })
    }

    /// Pack into the wire byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        ((self.format as u8) << 6)
            | ((self.tier as u8) << 4)
            | ((self.compression as u8) << 2)
            | self.flags
    }

    /// Unpack from the wire byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(Self {
            format: PixelFormat::from_tag(byte >> 6)?,
            tier: SizeTier::from_tag((byte >> 4) & 0x3)?,
            compression: Compression::from_tag((byte >> 2) & 0x3)?,
            flags: byte & 0x3,
        })
    }

    /// Packed byte length of one full frame at this format and tier.
    #[must_use]
    pub fn packed_len(self) -> usize {
        pixels::packed_len(self.tier.pixel_count(), self.format.bpp())
    }
}

/// Borrowed image field for the encoder: control plus an
/// already-compressed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef<'a> {
    pub(crate) control: ImageControl,
    pub(crate) payload: &'a [u8],
}

impl<'a> ImageRef<'a> {
    /// Wrap a payload, validating it against the length prefix.
    pub fn new(control: ImageControl, payload: &'a [u8]) -> Result<Self> {
        if payload.len() > IMAGE_MAX_PAYLOAD {
            return Err(CodecError::ImageTooLong { len: payload.len() });
        }
        Ok(Self { control, payload })
    }

    /// Wire cost in bits: length, control, payload.
    #[must_use]
    pub fn wire_bits(&self) -> usize {
        16 + self.payload.len() * 8
    }
}

/// Decoded image field; the payload is still compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Image {
    /// Control byte fields.
    pub control: ImageControl,
    /// Compressed payload as carried on the wire.
    pub payload: Bytes,
}

impl Image {
    /// Decompress into a packed pixel buffer of exactly the tier size.
    pub fn decode_pixels(&self) -> Result<Vec<u8>> {
        decompress(self.control, &self.payload)
    }
}

/// Compress a packed pixel buffer into an image payload.
///
/// `pixels` must be exactly one frame at the control's format and
/// tier. The result is not length-checked here: the encoder rejects
/// payloads over [`IMAGE_MAX_PAYLOAD`] when the field is attached.
pub fn compress(control: ImageControl, pixels: &[u8]) -> Result<Vec<u8>> {
    let expected = control.packed_len();
    if pixels.len() != expected {
        return Err(CodecError::ImagePixelCount { expected, actual: pixels.len() });
    }
    Ok(match control.compression {
        Compression::Raw => pixels.to_vec(),
        Compression::Rle => {
            rle::compress(pixels, control.format.bpp(), control.tier.pixel_count())
        },
        Compression::Heatshrink => heatshrink::compress(pixels),
    })
}

/// Decompress an image payload into a packed pixel buffer.
pub fn decompress(control: ImageControl, payload: &[u8]) -> Result<Vec<u8>> {
    let expected = control.packed_len();
    match control.compression {
        Compression::Raw => {
            if payload.len() != expected {
                return Err(CodecError::ImagePixelCount { expected, actual: payload.len() });
            }
            Ok(payload.to_vec())
        },
        Compression::Rle => {
            rle::decompress(payload, control.format.bpp(), control.tier.pixel_count())
        },
        Compression::Heatshrink => {
            let out = heatshrink::decompress(payload, expected)?;
            if out.len() != expected {
                return Err(CodecError::ImagePixelCount { expected, actual: out.len() });
            }
            Ok(out)
        },
    }
}
