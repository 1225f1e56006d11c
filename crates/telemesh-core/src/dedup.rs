//! Duplicate-forward suppression.
//!
//! A fixed-capacity FIFO ring of recent (origin station, origin
//! sequence) pairs. Lookup is a linear scan; at 64 entries that is
//! cheaper than maintaining a map, and insertion evicts the oldest
//! entry once the ring is full.

/// Default ring capacity.
pub const DEDUP_CAPACITY: usize = 64;

/// FIFO ring of recently forwarded origins.
#[derive(Debug, Clone)]
pub struct DedupRing {
    slots: Vec<(u16, u16)>,
    next: usize,
    capacity: usize,
}

impl DedupRing {
    /// Create a ring holding up to `capacity` origins (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { slots: Vec::with_capacity(capacity), next: 0, capacity }
    }

    /// Whether an origin is currently remembered.
    #[must_use]
    pub fn contains(&self, station: u16, sequence: u16) -> bool {
        self.slots.contains(&(station, sequence))
    }

    /// Admit an origin: returns `true` and remembers it when unseen,
    /// `false` for a duplicate. A full ring evicts its oldest entry.
    pub fn admit(&mut self, station: u16, sequence: u16) -> bool {
        if self.contains(station, sequence) {
            return false;
        }
        if self.slots.len() < self.capacity {
            self.slots.push((station, sequence));
        } else {
            self.slots[self.next] = (station, sequence);
        }
        self.next = (self.next + 1) % self.capacity;
        true
    }

    /// Entries currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been admitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for DedupRing {
    fn default() -> Self {
        Self::new(DEDUP_CAPACITY)
    }
}
