//! Mesh relay engine.
//!
//! The engine is the single owner of one node's routing state. It is
//! Sans-IO: callers deliver received frames (with their receive RSSI)
//! and get back a list of [`MeshAction`]s to perform — transmissions,
//! local deliveries, topology notifications. The engine never touches
//! a radio and never blocks, so the surrounding task model is entirely
//! the caller's choice; inside the engine all state mutation is
//! serialized by `&mut self`.
//!
//! # Flow
//!
//! 1. **Observe**: every valid frame refreshes the neighbour table.
//! 2. **Route**: beacons drive parent selection (newer generation wins
//!    outright; within a generation, lowest cost then lowest station).
//! 3. **Relay**: forwards are deduplicated by origin, ACKed to the
//!    previous hop, TTL-decremented and re-wrapped toward the parent;
//!    the gateway delivers instead.
//!
//! # Invariants
//!
//! - An origin (station, sequence) is relayed at most once while it
//!   remains in the dedup ring.
//! - The engine never transmits with TTL 0 remaining.
//! - Sequence numbers on transmitted frames are strictly increasing
//!   (mod 2^16) per engine.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use telemesh_proto::{
    MeshControl, MeshPacket, PacketHeader,
    mesh::{NeighbourEntry, PARENT_NONE, RouteErrorReason, TTL_DEFAULT},
};

use crate::{
    dedup::{DEDUP_CAPACITY, DedupRing},
    error::MeshError,
    neighbours::{NEIGHBOUR_CAPACITY, NeighbourTable},
    routing::{ParentCandidate, generation_newer},
};

/// Most pending-ACK records kept before the oldest is dropped.
const PENDING_MAX: usize = 16;

/// Tunables for one engine instance.
#[derive(Debug, Clone, Copy)]
pub struct MeshConfig {
    /// TTL stamped on locally originated forwards.
    pub ttl_default: u8,
    /// Dedup ring capacity.
    pub dedup_capacity: usize,
    /// Neighbour table capacity.
    pub neighbour_capacity: usize,
    /// Entry cap for one neighbour report.
    pub report_max: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            ttl_default: TTL_DEFAULT,
            dedup_capacity: DEDUP_CAPACITY,
            neighbour_capacity: NEIGHBOUR_CAPACITY,
            report_max: NEIGHBOUR_CAPACITY,
        }
    }
}

/// What the caller should do after the engine processed an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshAction {
    /// Put these bytes on the air.
    Transmit(Bytes),
    /// Hand a completed upstream packet to the gateway application.
    Deliver {
        /// Origin station of the inner packet.
        origin: u16,
        /// Origin sequence of the inner packet.
        sequence: u16,
        /// The inner sensor packet, header included.
        payload: Bytes,
    },
    /// A (new or better) parent was adopted.
    ParentChanged {
        /// The new parent station.
        parent: u16,
        /// The parent's advertised cost.
        cost: u8,
    },
    /// The parent was invalidated; re-acquisition starts on the next
    /// beacon.
    ParentLost,
    /// The parent confirmed custody of a forwarded origin.
    AckConfirmed {
        /// Origin station.
        station: u16,
        /// Origin sequence.
        sequence: u16,
    },
    /// A neighbour report arrived (gateway-side collection).
    ReportReceived {
        /// Reporting station.
        station: u16,
        /// Reporter's parent.
        parent: u16,
        /// Reporter's path cost.
        cost: u8,
        /// Reported neighbour entries.
        entries: Vec<NeighbourEntry>,
    },
    /// A pong arrived for an earlier ping.
    PongReceived {
        /// Responding station.
        station: u16,
        /// Echoed token.
        tag: u16,
    },
}

/// Per-node mesh relay state machine.
#[derive(Debug)]
pub struct MeshEngine {
    station: u16,
    is_gateway: bool,
    config: MeshConfig,
    sequence: u16,
    parent: Option<u16>,
    parent_cost: u8,
    gateway: Option<u16>,
    last_generation: Option<u16>,
    dedup: DedupRing,
    neighbours: NeighbourTable,
    pending: Vec<(u16, u16)>,
    clock: u64,
}

impl MeshEngine {
    /// Create a relay hop.
    pub fn node(station: u16, config: MeshConfig) -> Result<Self, MeshError> {
        PacketHeader::check_station(station)?;
        Ok(Self::build(station, false, config))
    }

    /// Create the gateway. The gateway terminates forwards and
    /// originates beacon generations.
    pub fn gateway(station: u16, config: MeshConfig) -> Result<Self, MeshError> {
        PacketHeader::check_station(station)?;
        let mut engine = Self::build(station, true, config);
        engine.gateway = Some(station);
        engine.last_generation = Some(0);
        Ok(engine)
    }

    fn build(station: u16, is_gateway: bool, config: MeshConfig) -> Self {
        Self {
            station,
            is_gateway,
            config,
            sequence: 0,
            parent: None,
            parent_cost: u8::MAX,
            gateway: None,
            last_generation: None,
            dedup: DedupRing::new(config.dedup_capacity),
            neighbours: NeighbourTable::new(config.neighbour_capacity),
            pending: Vec::new(),
            clock: 0,
        }
    }

    /// This node's station id.
    #[must_use]
    pub fn station(&self) -> u16 {
        self.station
    }

    /// Current parent, if joined to a tree.
    #[must_use]
    pub fn parent(&self) -> Option<u16> {
        self.parent
    }

    /// Path cost this node would advertise.
    #[must_use]
    pub fn path_cost(&self) -> u8 {
        if self.is_gateway { 0 } else { self.parent_cost.saturating_add(1) }
    }

    /// Last beacon generation observed (or originated, for the
    /// gateway).
    #[must_use]
    pub fn last_generation(&self) -> Option<u16> {
        self.last_generation
    }

    /// Read-only view of the neighbour table.
    #[must_use]
    pub fn neighbours(&self) -> &NeighbourTable {
        &self.neighbours
    }

    /// Origins currently remembered by the dedup ring.
    #[must_use]
    pub fn dedup_len(&self) -> usize {
        self.dedup.len()
    }

    /// Process one received frame.
    ///
    /// `rssi_dbm` is the receive strength reported by the radio; it
    /// feeds the neighbour table. Frames this engine itself sent (same
    /// station id) are ignored.
    pub fn handle_packet(
        &mut self,
        bytes: &[u8],
        rssi_dbm: i16,
    ) -> Result<Vec<MeshAction>, MeshError> {
        let packet = MeshPacket::decode(bytes)?;
        if packet.sender == self.station {
            trace!(station = self.station, "own frame echoed back, ignoring");
            return Ok(Vec::new());
        }
        self.clock += 1;
        self.neighbours.observe(packet.sender, rssi_dbm, self.clock);

        match packet.control {
            MeshControl::Beacon { gateway, cost, flags: _, generation } => {
                self.handle_beacon(packet.sender, gateway, cost, generation)
            },
            MeshControl::Forward { ttl, inner } => self.handle_forward(ttl, &inner),
            MeshControl::Ack { station, sequence } => Ok(self.handle_ack(station, sequence)),
            MeshControl::RouteError { reason } => Ok(self.handle_route_error(packet.sender, reason)),
            MeshControl::NeighbourReport { parent, cost, entries } => {
                Ok(vec![MeshAction::ReportReceived {
                    station: packet.sender,
                    parent,
                    cost,
                    entries,
                }])
            },
            MeshControl::Ping { tag } => {
                let pong = self.frame(MeshControl::Pong { tag })?;
                Ok(vec![MeshAction::Transmit(pong)])
            },
            MeshControl::Pong { tag } => {
                Ok(vec![MeshAction::PongReceived { station: packet.sender, tag }])
            },
        }
    }

    fn handle_beacon(
        &mut self,
        sender: u16,
        gateway: u16,
        cost: u8,
        generation: u16,
    ) -> Result<Vec<MeshAction>, MeshError> {
        if self.is_gateway {
            trace!(sender, "gateway ignores beacons");
            return Ok(Vec::new());
        }
        let adopt = match self.last_generation {
            None => true,
            // A newer generation invalidates the current parent
            // regardless of cost.
            Some(last) if generation_newer(generation, last) => true,
            Some(last) if generation == last => {
                if self.parent == Some(sender) {
                    // The current parent re-advertised; track its cost
                    // without a re-adoption action.
                    if self.parent_cost != cost {
                        trace!(parent = sender, cost, "parent cost updated");
                        self.parent_cost = cost;
                    }
                    false
                } else {
                    let offer = ParentCandidate { cost, station: sender };
                    match self.parent {
                        Some(parent) => {
                            offer < ParentCandidate { cost: self.parent_cost, station: parent }
                        },
                        None => true,
                    }
                }
            },
            Some(_) => {
                trace!(sender, generation, "stale beacon ignored");
                false
            },
        };
        if !adopt {
            return Ok(Vec::new());
        }
        self.parent = Some(sender);
        self.parent_cost = cost;
        self.gateway = Some(gateway);
        self.last_generation = Some(generation);
        debug!(parent = sender, cost, generation, "adopted parent");
        Ok(vec![MeshAction::ParentChanged { parent: sender, cost }])
    }

    fn handle_forward(&mut self, ttl: u8, inner: &Bytes) -> Result<Vec<MeshAction>, MeshError> {
        let origin = PacketHeader::peek(inner)?;
        if !self.dedup.admit(origin.station, origin.sequence) {
            trace!(
                origin = origin.station,
                sequence = origin.sequence,
                "duplicate forward dropped"
            );
            return Ok(Vec::new());
        }

        if self.is_gateway {
            let ack = self.frame(MeshControl::Ack {
                station: origin.station,
                sequence: origin.sequence,
            })?;
            return Ok(vec![
                MeshAction::Transmit(ack),
                MeshAction::Deliver {
                    origin: origin.station,
                    sequence: origin.sequence,
                    payload: inner.clone(),
                },
            ]);
        }

        if ttl <= 1 {
            debug!(origin = origin.station, ttl, "forward dropped, ttl exhausted");
            return Ok(Vec::new());
        }

        if self.parent.is_none() {
            warn!(origin = origin.station, "forward received while orphaned");
            let err = self.frame(MeshControl::RouteError {
                reason: RouteErrorReason::ParentLost,
            })?;
            return Ok(vec![MeshAction::Transmit(err)]);
        }

        let ack = self.frame(MeshControl::Ack {
            station: origin.station,
            sequence: origin.sequence,
        })?;
        let relayed =
            self.frame(MeshControl::Forward { ttl: ttl - 1, inner: inner.clone() })?;
        self.track_pending(origin.station, origin.sequence);
        debug!(
            origin = origin.station,
            sequence = origin.sequence,
            ttl = ttl - 1,
            "forward relayed upstream"
        );
        Ok(vec![MeshAction::Transmit(ack), MeshAction::Transmit(relayed)])
    }

    fn handle_ack(&mut self, station: u16, sequence: u16) -> Vec<MeshAction> {
        let before = self.pending.len();
        self.pending.retain(|&(s, q)| (s, q) != (station, sequence));
        if self.pending.len() == before {
            trace!(station, sequence, "ack for unknown forward ignored");
            return Vec::new();
        }
        vec![MeshAction::AckConfirmed { station, sequence }]
    }

    fn handle_route_error(&mut self, sender: u16, reason: RouteErrorReason) -> Vec<MeshAction> {
        if self.parent == Some(sender) {
            warn!(parent = sender, ?reason, "parent reported route error");
            self.parent = None;
            self.parent_cost = u8::MAX;
            return vec![MeshAction::ParentLost];
        }
        trace!(sender, ?reason, "route error from non-parent ignored");
        Vec::new()
    }

    /// Wrap a locally produced sensor packet for upstream transport.
    ///
    /// The gateway delivers locally; a joined hop transmits a FORWARD
    /// with the default TTL; an orphaned hop fails with
    /// [`MeshError::NoRoute`].
    pub fn originate(&mut self, inner: &[u8]) -> Result<Vec<MeshAction>, MeshError> {
        let origin = PacketHeader::peek(inner)?;
        self.dedup.admit(origin.station, origin.sequence);
        if self.is_gateway {
            return Ok(vec![MeshAction::Deliver {
                origin: origin.station,
                sequence: origin.sequence,
                payload: Bytes::copy_from_slice(inner),
            }]);
        }
        if self.parent.is_none() {
            return Err(MeshError::NoRoute);
        }
        let frame = self.frame(MeshControl::Forward {
            ttl: self.config.ttl_default,
            inner: Bytes::copy_from_slice(inner),
        })?;
        self.track_pending(origin.station, origin.sequence);
        Ok(vec![MeshAction::Transmit(frame)])
    }

    /// Advertise the tree.
    ///
    /// The gateway starts a new generation each time; a joined hop
    /// re-advertises its own cost in the current generation. An
    /// unjoined hop has nothing to advertise.
    pub fn emit_beacon(&mut self) -> Result<Vec<MeshAction>, MeshError> {
        let (gateway, cost, generation) = if self.is_gateway {
            let next = (self.last_generation.unwrap_or(0) + 1) & 0xFFF;
            self.last_generation = Some(next);
            (self.station, 0, next)
        } else {
            let (Some(gateway), Some(generation)) = (self.gateway, self.last_generation) else {
                return Err(MeshError::NoRoute);
            };
            if self.parent.is_none() {
                return Err(MeshError::NoRoute);
            }
            (gateway, self.path_cost(), generation)
        };
        let frame =
            self.frame(MeshControl::Beacon { gateway, cost, flags: 0, generation })?;
        Ok(vec![MeshAction::Transmit(frame)])
    }

    /// Snapshot the neighbour table into a report frame.
    pub fn make_neighbour_report(&mut self) -> Result<Vec<MeshAction>, MeshError> {
        let entries = self.neighbours.snapshot(self.config.report_max);
        let frame = self.frame(MeshControl::NeighbourReport {
            parent: self.parent.unwrap_or(PARENT_NONE),
            cost: self.path_cost(),
            entries,
        })?;
        Ok(vec![MeshAction::Transmit(frame)])
    }

    /// Probe a neighbourhood with an echo token.
    pub fn send_ping(&mut self, tag: u16) -> Result<Vec<MeshAction>, MeshError> {
        let frame = self.frame(MeshControl::Ping { tag })?;
        Ok(vec![MeshAction::Transmit(frame)])
    }

    /// Broadcast a route error and invalidate the current parent.
    pub fn announce_route_error(
        &mut self,
        reason: RouteErrorReason,
    ) -> Result<Vec<MeshAction>, MeshError> {
        self.parent = None;
        self.parent_cost = u8::MAX;
        let frame = self.frame(MeshControl::RouteError { reason })?;
        warn!(?reason, "announcing route error");
        Ok(vec![MeshAction::Transmit(frame), MeshAction::ParentLost])
    }

    /// Link-layer report: the ACK for a forwarded origin never came
    /// and retries are exhausted. Drops the pending record, gives up
    /// on the parent and signals the failure.
    pub fn link_timeout(
        &mut self,
        station: u16,
        sequence: u16,
    ) -> Result<Vec<MeshAction>, MeshError> {
        let before = self.pending.len();
        self.pending.retain(|&(s, q)| (s, q) != (station, sequence));
        if self.pending.len() == before {
            trace!(station, sequence, "timeout for unknown forward ignored");
            return Ok(Vec::new());
        }
        warn!(station, sequence, "link timeout, dropping parent");
        self.announce_route_error(RouteErrorReason::ParentLost)
    }

    fn track_pending(&mut self, station: u16, sequence: u16) {
        if self.pending.len() >= PENDING_MAX {
            self.pending.remove(0);
        }
        self.pending.push((station, sequence));
    }

    fn frame(&mut self, control: MeshControl) -> Result<Bytes, MeshError> {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        let packet = MeshPacket { sender: self.station, sequence, control };
        Ok(Bytes::from(packet.encode_to_vec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon(sender: u16, cost: u8, generation: u16) -> Vec<u8> {
        MeshPacket {
            sender,
            sequence: 1,
            control: MeshControl::Beacon { gateway: 1, cost, flags: 0, generation },
        }
        .encode_to_vec()
        .unwrap()
    }

    #[test]
    fn first_beacon_adopts_a_parent() {
        let mut engine = MeshEngine::node(10, MeshConfig::default()).unwrap();
        let actions = engine.handle_packet(&beacon(2, 1, 100), -80).unwrap();
        assert_eq!(actions, vec![MeshAction::ParentChanged { parent: 2, cost: 1 }]);
        assert_eq!(engine.parent(), Some(2));
        assert_eq!(engine.path_cost(), 2);
    }

    #[test]
    fn same_generation_prefers_lower_cost_then_lower_station() {
        let mut engine = MeshEngine::node(10, MeshConfig::default()).unwrap();
        engine.handle_packet(&beacon(5, 2, 100), -80).unwrap();
        // Higher cost loses.
        assert!(engine.handle_packet(&beacon(6, 3, 100), -80).unwrap().is_empty());
        // Equal cost, lower station wins.
        let actions = engine.handle_packet(&beacon(4, 2, 100), -80).unwrap();
        assert_eq!(actions, vec![MeshAction::ParentChanged { parent: 4, cost: 2 }]);
        // Lower cost wins outright.
        let actions = engine.handle_packet(&beacon(9, 1, 100), -80).unwrap();
        assert_eq!(actions, vec![MeshAction::ParentChanged { parent: 9, cost: 1 }]);
    }

    #[test]
    fn newer_generation_wins_regardless_of_cost() {
        let mut engine = MeshEngine::node(10, MeshConfig::default()).unwrap();
        engine.handle_packet(&beacon(5, 1, 4090), -80).unwrap();
        let actions = engine.handle_packet(&beacon(6, 200, 3), -80).unwrap();
        assert_eq!(actions, vec![MeshAction::ParentChanged { parent: 6, cost: 200 }]);
        assert_eq!(engine.last_generation(), Some(3));
    }

    #[test]
    fn own_frames_are_ignored() {
        let mut engine = MeshEngine::node(10, MeshConfig::default()).unwrap();
        assert!(engine.handle_packet(&beacon(10, 0, 5), -40).unwrap().is_empty());
        assert_eq!(engine.parent(), None);
    }

    #[test]
    fn ping_answers_pong_with_the_same_tag() {
        let mut engine = MeshEngine::node(10, MeshConfig::default()).unwrap();
        let ping = MeshPacket {
            sender: 4,
            sequence: 0,
            control: MeshControl::Ping { tag: 0xC0DE },
        }
        .encode_to_vec()
        .unwrap();
        let actions = engine.handle_packet(&ping, -75).unwrap();
        let MeshAction::Transmit(bytes) = &actions[0] else {
            unreachable!("ping must answer");
        };
        let reply = MeshPacket::decode(bytes).unwrap();
        assert_eq!(reply.control, MeshControl::Pong { tag: 0xC0DE });
        assert_eq!(reply.sender, 10);
    }
}
