use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::scorer::{CandidateScore, ScoredCandidate, SubsetGap};

#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    /// Position in the canonical enumeration; breaks score ties.
    pub ordinal: u64,
    pub value: f64,
    pub numbers: Vec<u8>,
    pub avg_gap: f64,
    pub min_gap: u32,
    pub subsets: Vec<SubsetGap>,
}

impl TopEntry {
    pub fn new(ordinal: u64, value: f64, numbers: Vec<u8>, score: CandidateScore, subsets: Vec<SubsetGap>) -> Self {
        Self {
            ordinal,
            value,
            numbers,
            avg_gap: score.avg_gap,
            min_gap: score.min_gap,
            subsets,
        }
    }

    /// Descending score, then ascending enumeration order.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

impl From<ScoredCandidate> for TopEntry {
    fn from(c: ScoredCandidate) -> Self {
        TopEntry::new(c.ordinal, c.value, c.numbers, c.score, c.subsets)
    }
}

/// Heap slot ordered so that the heap's maximum is the weakest entry held:
/// lowest score, and among equal scores the latest enumerated.
#[derive(Debug)]
struct Slot(TopEntry);

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Slot {}

impl PartialOrd for Slot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Keeps the `capacity` best candidates of a stream. A full selector only admits a
/// candidate whose score is strictly greater than the weakest one held, so among equal
/// scores the first enumerated wins.
#[derive(Debug)]
pub struct TopKSelector {
    capacity: usize,
    heap: BinaryHeap<Slot>,
}

impl TopKSelector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(1 << 16) + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Cheap pre-check so callers only build the breakdown of admitted candidates.
    #[inline]
    pub fn admits(&self, value: f64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            return true;
        }
        match self.heap.peek() {
            Some(weakest) => value > weakest.0.value,
            None => true,
        }
    }

    /// Returns `true` if the entry was kept.
    pub fn offer(&mut self, entry: TopEntry) -> bool {
        if !self.admits(entry.value) {
            return false;
        }
        if self.heap.len() >= self.capacity {
            self.heap.pop();
        }
        self.heap.push(Slot(entry));
        true
    }

    /// Lowest score currently held.
    pub fn threshold(&self) -> Option<f64> {
        self.heap.peek().map(|s| s.0.value)
    }

    /// Merges another selector's entries, keeping the `capacity` best by
    /// (score desc, ordinal asc). Both sides must come from disjoint ordinals.
    pub fn merge(self, other: TopKSelector) -> TopKSelector {
        let capacity = self.capacity;
        let mut entries = self.into_sorted();
        entries.extend(other.into_sorted());
        entries.sort_by(TopEntry::rank_cmp);
        entries.truncate(capacity);
        let mut merged = TopKSelector::new(capacity);
        merged.heap.extend(entries.into_iter().map(Slot));
        merged
    }

    /// Published ranking: descending score, ties in enumeration order.
    pub fn into_sorted(self) -> Vec<TopEntry> {
        let mut entries: Vec<TopEntry> = self.heap.into_iter().map(|s| s.0).collect();
        entries.sort_by(TopEntry::rank_cmp);
        entries
    }
}
