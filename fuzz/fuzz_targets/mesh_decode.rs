//! Fuzz target for MeshPacket::decode
//!
//! Arbitrary bytes through the mesh control parser: control nibbles,
//! nibble-packed station fields, inner FORWARD payloads and neighbour
//! entry counts all come from the fuzzer. Must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use telemesh_proto::MeshPacket;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = MeshPacket::decode(data) {
        // Round-trip: decoded control re-encodes without error.
        let wire = packet.encode_to_vec().expect("decoded mesh packet must re-encode");
        assert_eq!(MeshPacket::decode(&wire).expect("re-decode"), packet);
    }
});
