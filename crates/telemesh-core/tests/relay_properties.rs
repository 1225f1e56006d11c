//! Property-based tests for the relay engine.

use bytes::Bytes;
use proptest::prelude::*;
use telemesh_core::{MeshAction, MeshConfig, MeshEngine};
use telemesh_proto::{Encoder, MeshControl, MeshPacket, field::Battery};

fn sensor_packet(station: u16, sequence: u16) -> Vec<u8> {
    let mut buf = [0u8; 16];
    let mut enc = Encoder::begin(&mut buf, 0, station, sequence).unwrap();
    enc.battery(Battery::new(50, false).unwrap()).unwrap();
    let len = enc.end().unwrap();
    buf[..len].to_vec()
}

fn joined_hop() -> MeshEngine {
    let mut hop = MeshEngine::node(2, MeshConfig::default()).unwrap();
    let beacon = MeshPacket {
        sender: 1,
        sequence: 0,
        control: MeshControl::Beacon { gateway: 1, cost: 0, flags: 0, generation: 1 },
    }
    .encode_to_vec()
    .unwrap();
    hop.handle_packet(&beacon, -70).unwrap();
    hop
}

proptest! {
    /// The engine returns errors, never panics, on arbitrary input
    /// bytes.
    #[test]
    fn handle_packet_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..48)) {
        let mut hop = joined_hop();
        let _ = hop.handle_packet(&bytes, -80);
    }

    /// Each distinct origin is relayed at most once while it stays in
    /// the dedup window, however the copies are interleaved.
    #[test]
    fn origins_relay_at_most_once(
        deliveries in proptest::collection::vec((1u16..=8, 0u16..=3), 1..=40)
    ) {
        let mut hop = joined_hop();
        let mut relayed = std::collections::HashMap::new();
        for (station, sequence) in deliveries {
            let forward = MeshPacket {
                sender: 3,
                sequence: 0,
                control: MeshControl::Forward {
                    ttl: 5,
                    inner: Bytes::from(sensor_packet(station, sequence)),
                },
            }
            .encode_to_vec()
            .unwrap();
            let actions = hop.handle_packet(&forward, -80).unwrap();
            let forwards = actions
                .iter()
                .filter(|a| {
                    matches!(a, MeshAction::Transmit(bytes)
                        if matches!(
                            MeshPacket::decode(bytes).unwrap().control,
                            MeshControl::Forward { .. }
                        ))
                })
                .count();
            *relayed.entry((station, sequence)).or_insert(0) += forwards;
        }
        for (origin, count) in relayed {
            prop_assert!(count <= 1, "origin {origin:?} relayed {count} times");
        }
    }

    /// Relayed forwards always carry exactly one less TTL, and nothing
    /// is relayed once the budget runs out.
    #[test]
    fn ttl_always_decrements(ttl in 0u8..=9, station in 1u16..=4095, sequence in any::<u16>()) {
        let mut hop = joined_hop();
        let forward = MeshPacket {
            sender: 3,
            sequence: 0,
            control: MeshControl::Forward {
                ttl,
                inner: Bytes::from(sensor_packet(station, sequence)),
            },
        }
        .encode_to_vec()
        .unwrap();
        let actions = hop.handle_packet(&forward, -80).unwrap();
        let relayed: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                MeshAction::Transmit(bytes) => match MeshPacket::decode(bytes).unwrap().control {
                    MeshControl::Forward { ttl, .. } => Some(ttl),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        if ttl <= 1 {
            prop_assert!(relayed.is_empty());
        } else {
            prop_assert_eq!(relayed, vec![ttl - 1]);
        }
    }

    /// Transmitted frames carry strictly increasing sequence numbers.
    #[test]
    fn transmit_sequences_increase(count in 1usize..=20) {
        let mut hop = joined_hop();
        let mut last = None;
        for i in 0..count {
            let actions = hop.send_ping(i as u16).unwrap();
            let MeshAction::Transmit(bytes) = &actions[0] else { unreachable!() };
            let packet = MeshPacket::decode(bytes).unwrap();
            if let Some(prev) = last {
                prop_assert_eq!(packet.sequence, prev + 1);
            }
            last = Some(packet.sequence);
        }
    }
}
