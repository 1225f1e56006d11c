//! Fuzz target for the mesh engine state machine
//!
//! Drives a node and a gateway engine with arbitrary operation
//! sequences: received frames (valid and garbage), originations,
//! beacon emissions, timeouts.
//!
//! # Invariants
//!
//! - The engine never panics, whatever arrives or in what order
//! - A distinct origin is relayed upstream at most once per dedup
//!   window
//! - Relayed forwards never carry TTL 0

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use telemesh_core::{MeshAction, MeshConfig, MeshEngine};
use telemesh_proto::{MeshControl, MeshPacket, mesh::RouteErrorReason};

#[derive(Debug, Arbitrary)]
enum Op {
    Beacon { sender: u16, cost: u8, generation: u16 },
    Forward { sender: u16, ttl: u8, origin_station: u16, origin_sequence: u16 },
    Ack { sender: u16, station: u16, sequence: u16 },
    RouteError { sender: u16 },
    Ping { sender: u16, tag: u16 },
    RawBytes { bytes: Vec<u8> },
    Originate { station: u16, sequence: u16 },
    EmitBeacon,
    NeighbourReport,
    LinkTimeout { station: u16, sequence: u16 },
}

fn clamp_station(station: u16) -> u16 {
    (station % 4095) + 1
}

fn inner_packet(station: u16, sequence: u16) -> Bytes {
    // Minimal empty weather_station packet. The origin space is kept
    // far below the dedup window so eviction cannot legitimise a
    // second relay and break the relay-once assertion.
    let station = (station % 8) + 1;
    let sequence = sequence % 4;
    let hi = (station >> 8) as u8;
    let lo = (station & 0xFF) as u8;
    Bytes::from(vec![hi, lo, (sequence >> 8) as u8, (sequence & 0xFF) as u8, 0])
}

fn frame(sender: u16, control: MeshControl) -> Vec<u8> {
    MeshPacket { sender: clamp_station(sender), sequence: 0, control }
        .encode_to_vec()
        .expect("fuzz frames use valid stations")
}

fuzz_target!(|ops: Vec<Op>| {
    let mut node = MeshEngine::node(2, MeshConfig::default()).expect("valid station");
    let mut gateway = MeshEngine::gateway(1, MeshConfig::default()).expect("valid station");
    let mut relayed = std::collections::HashMap::new();

    for op in ops {
        let bytes = match op {
            Op::Beacon { sender, cost, generation } => Some(frame(
                sender,
                MeshControl::Beacon {
                    gateway: 1,
                    cost,
                    flags: 0,
                    generation: generation % 4096,
                },
            )),
            Op::Forward { sender, ttl, origin_station, origin_sequence } => Some(frame(
                sender,
                MeshControl::Forward {
                    ttl,
                    inner: inner_packet(origin_station, origin_sequence),
                },
            )),
            Op::Ack { sender, station, sequence } => {
                Some(frame(sender, MeshControl::Ack { station, sequence }))
            },
            Op::RouteError { sender } => Some(frame(
                sender,
                MeshControl::RouteError { reason: RouteErrorReason::ParentLost },
            )),
            Op::Ping { sender, tag } => Some(frame(sender, MeshControl::Ping { tag })),
            Op::RawBytes { bytes } => Some(bytes),
            Op::Originate { station, sequence } => {
                let inner = inner_packet(station, sequence);
                let _ = node.originate(&inner);
                let _ = gateway.originate(&inner);
                None
            },
            Op::EmitBeacon => {
                let _ = node.emit_beacon();
                let _ = gateway.emit_beacon();
                None
            },
            Op::NeighbourReport => {
                let _ = node.make_neighbour_report();
                None
            },
            Op::LinkTimeout { station, sequence } => {
                let _ = node.link_timeout(station, sequence);
                None
            },
        };

        let Some(bytes) = bytes else { continue };
        let _ = gateway.handle_packet(&bytes, -80);
        let Ok(actions) = node.handle_packet(&bytes, -80) else { continue };
        for action in actions {
            let MeshAction::Transmit(wire) = action else { continue };
            let packet = MeshPacket::decode(&wire).expect("engine emits valid frames");
            if let MeshControl::Forward { ttl, inner } = packet.control {
                assert!(ttl > 0, "engine must not relay a dead forward");
                let header = telemesh_proto::PacketHeader::peek(&inner).expect("valid inner");
                let count = relayed.entry((header.station, header.sequence)).or_insert(0u32);
                *count += 1;
                assert!(*count <= 1, "origin relayed more than once in window");
            }
        }
    }
});
