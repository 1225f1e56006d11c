//! Neighbour table and RSSI quantization.
//!
//! Every valid mesh packet refreshes the sender's entry with its
//! quantized receive strength. The table is bounded; when full, the
//! entry heard longest ago is evicted. Snapshots feed neighbour
//! reports.

use telemesh_proto::mesh::NeighbourEntry;

/// Table capacity.
pub const NEIGHBOUR_CAPACITY: usize = 63;

/// Quantize an RSSI reading: 4 bits, 5 dBm steps, floor -120 dBm.
#[must_use]
pub fn quantize_rssi(rssi_dbm: i16) -> u8 {
    ((rssi_dbm + 120).clamp(0, 75) / 5) as u8
}

/// Recover the dBm floor of a quantized RSSI.
#[must_use]
pub fn dequantize_rssi(q: u8) -> i16 {
    i16::from(q & 0x0F) * 5 - 120
}

#[derive(Debug, Clone)]
struct Neighbour {
    station: u16,
    rssi_q: u8,
    flags: u8,
    last_heard: u64,
}

/// Bounded table of recently heard stations.
#[derive(Debug, Clone)]
pub struct NeighbourTable {
    entries: Vec<Neighbour>,
    capacity: usize,
}

impl NeighbourTable {
    /// Create a table holding up to `capacity` stations (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, NEIGHBOUR_CAPACITY);
        Self { entries: Vec::with_capacity(capacity), capacity }
    }

    /// Record a reception from `station` at tick `now`.
    pub fn observe(&mut self, station: u16, rssi_dbm: i16, now: u64) {
        let rssi_q = quantize_rssi(rssi_dbm);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.station == station) {
            entry.rssi_q = rssi_q;
            entry.last_heard = now;
            return;
        }
        if self.entries.len() >= self.capacity {
            // Evict the station heard longest ago.
            if let Some(oldest) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_heard)
                .map(|(i, _)| i)
            {
                self.entries.swap_remove(oldest);
            }
        }
        self.entries.push(Neighbour { station, rssi_q, flags: 0, last_heard: now });
    }

    /// Stations currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been heard yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Quantized RSSI of a tracked station.
    #[must_use]
    pub fn rssi_q(&self, station: u16) -> Option<u8> {
        self.entries.iter().find(|e| e.station == station).map(|e| e.rssi_q)
    }

    /// Up to `max` report entries, most recently heard first.
    #[must_use]
    pub fn snapshot(&self, max: usize) -> Vec<NeighbourEntry> {
        let mut ordered: Vec<&Neighbour> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.last_heard.cmp(&a.last_heard).then(a.station.cmp(&b.station)));
        ordered
            .into_iter()
            .take(max)
            .map(|e| NeighbourEntry { station: e.station, rssi_q: e.rssi_q, flags: e.flags })
            .collect()
    }
}

impl Default for NeighbourTable {
    fn default() -> Self {
        Self::new(NEIGHBOUR_CAPACITY)
    }
}
