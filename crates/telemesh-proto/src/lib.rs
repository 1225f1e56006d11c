//! Telemesh wire codec.
//!
//! Bit-packed telemetry packets for constrained sensors: a four-byte
//! header (`variant | station | sequence`), a chained presence bitmap,
//! quantized fields in schema order, an optional TLV tail, and — in
//! variant 15 — the mesh control packets that relay everything else
//! toward a gateway.
//!
//! The crate is pure: no I/O, no logging, no global state. Encoders
//! write into caller buffers; decoders copy variable payloads into
//! owned buffers. The relay state machine that consumes mesh packets
//! lives in `telemesh-core`.
//!
//! # Example
//!
//! ```
//! use telemesh_proto::{Encoder, Packet, field::{Battery, Environment}};
//!
//! let mut buf = [0u8; 32];
//! let mut enc = Encoder::begin(&mut buf, 0, 42, 1)?;
//! enc.battery(Battery::new(75, false)?)?;
//! enc.environment(Environment::new_scaled(2150, 1013, 60)?)?;
//! let len = enc.end()?;
//!
//! let packet = Packet::decode(&buf[..len])?;
//! assert_eq!(packet.fields.battery.unwrap().level_pct(), 75);
//! # Ok::<(), telemesh_proto::CodecError>(())
//! ```

pub mod bitstream;
pub mod errors;
pub mod field;
pub mod header;
pub mod image;
pub mod mesh;
pub mod quantize;
pub mod schema;
pub mod tlv;

mod decoder;
mod encoder;

pub use decoder::Packet;
pub use encoder::{Encoder, MIN_PACKET_BYTES};
pub use errors::{CodecError, Result};
pub use header::PacketHeader;
pub use mesh::{MeshControl, MeshPacket};
