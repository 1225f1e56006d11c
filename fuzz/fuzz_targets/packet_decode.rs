//! Fuzz target for Packet::decode
//!
//! Feeds arbitrary byte sequences to the sensor packet decoder to find:
//! - Parser crashes or panics
//! - Out-of-bounds bit reads
//! - Presence chains that walk past the schema
//! - Length prefixes that escape the buffer
//!
//! The fuzzer should NEVER panic. All invalid inputs must return an
//! error, and anything that decodes must re-encode and decode back to
//! an equal packet (pad bits in the final byte are not packet state,
//! so byte equality is only guaranteed for encoder-produced input).

#![no_main]

use libfuzzer_sys::fuzz_target;
use telemesh_proto::Packet;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = Packet::decode(data) {
        let mut buf = vec![0u8; packet.wire_len()];
        let len = packet.reencode(&mut buf).expect("decoded packet must re-encode");
        let again = Packet::decode(&buf[..len]).expect("re-encoded packet must decode");
        assert_eq!(again, packet);
    }
});
