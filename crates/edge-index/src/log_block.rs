//! Log Block — an append-only sequence of begin/end entries guarded by a Bloom filter, so a
//! negative `has_edge` lookup almost never has to walk the log. Because entries are never
//! mutated in place, updating or removing an edge means closing the previous entry and (for an
//! update) appending a fresh one; lookups scan backward from the tail to find the entry current
//! as of a given timestamp.

use hashbrown::{HashMap, HashSet};

use crate::capability::EdgeIndex;
use crate::entry::BeginEndEntry;
use crate::error::EdgeIndexResult;

const MIN_FILTER_CAPACITY: usize = 16;
const HASHES: usize = 4;

#[derive(Debug)]
struct BloomFilter {
    bits: Vec<bool>,
}

impl BloomFilter {
    fn with_capacity(expected_items: usize) -> Self {
        let slots = expected_items.max(MIN_FILTER_CAPACITY).next_power_of_two();
        let num_bits = (slots * 8).next_power_of_two();
        Self {
            bits: vec![false; num_bits],
        }
    }

    fn slot(&self, dest: u64, i: usize) -> usize {
        let h1 = dest.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let h2 = (dest ^ 0xC2B2_AE3D_27D4_EB4F).rotate_left(17);
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % self.bits.len() as u64) as usize
    }

    fn insert(&mut self, dest: u64) {
        for i in 0..HASHES {
            let slot = self.slot(dest, i);
            self.bits[slot] = true;
        }
    }

    fn might_contain(&self, dest: u64) -> bool {
        (0..HASHES).all(|i| self.bits[self.slot(dest, i)])
    }
}

#[derive(Debug)]
pub struct LogBlock {
    entries: Vec<BeginEndEntry>,
    filter: BloomFilter,
    /// Entry count the current filter was sized for; crossing the next power-of-sixteen
    /// threshold (16, 256, 4096, ...) triggers a rebuild.
    threshold: usize,
}

impl LogBlock {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_latest_pos(&self, dest: u64) -> Option<usize> {
        self.entries.iter().rposition(|e| e.dest == dest)
    }

    fn maybe_resize_filter(&mut self) {
        let count = self.entries.len();
        if count <= MIN_FILTER_CAPACITY || count <= self.threshold {
            return;
        }
        let mut threshold = MIN_FILTER_CAPACITY;
        while threshold < count {
            threshold = threshold.saturating_mul(16);
        }
        self.threshold = threshold;
        let mut filter = BloomFilter::with_capacity(threshold);
        for e in &self.entries {
            filter.insert(e.dest);
        }
        self.filter = filter;
    }

    /// Resolves, for every destination, the entry visible at `t` (if any), in first-append
    /// order — the log block never reorders by destination.
    fn visible_snapshot(&self, t: u64) -> Vec<(u64, f64)> {
        let mut current: HashMap<u64, f64> = HashMap::new();
        let mut decided: HashSet<u64> = HashSet::new();
        for e in self.entries.iter().rev() {
            if decided.contains(&e.dest) {
                continue;
            }
            if e.begin <= t {
                decided.insert(e.dest);
                if e.check_version(t) {
                    current.insert(e.dest, e.weight);
                }
            }
        }
        let mut emitted: HashSet<u64> = HashSet::new();
        let mut out = Vec::with_capacity(current.len());
        for e in &self.entries {
            if let Some(&w) = current.get(&e.dest) {
                if emitted.insert(e.dest) {
                    out.push((e.dest, w));
                }
            }
        }
        out
    }
}

impl EdgeIndex for LogBlock {
    type Iter<'a> = std::vec::IntoIter<(u64, f64)>;

    fn new() -> Self {
        Self {
            entries: Vec::new(),
            filter: BloomFilter::with_capacity(MIN_FILTER_CAPACITY),
            threshold: MIN_FILTER_CAPACITY,
        }
    }

    fn has_edge(&self, dest: u64, t: u64) -> bool {
        if !self.filter.might_contain(dest) {
            return false;
        }
        for e in self.entries.iter().rev() {
            if e.dest == dest && e.begin <= t {
                return e.check_version(t);
            }
        }
        false
    }

    fn insert_edge(&mut self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        if self.filter.might_contain(dest) {
            if let Some(pos) = self.find_latest_pos(dest) {
                if self.entries[pos].end == u64::MAX {
                    self.entries[pos].update_version(t)?;
                    self.entries.push(BeginEndEntry::new(dest, weight, t));
                    self.maybe_resize_filter();
                    return Ok(false);
                }
            }
        }
        self.entries.push(BeginEndEntry::new(dest, weight, t));
        self.filter.insert(dest);
        self.maybe_resize_filter();
        Ok(true)
    }

    fn insert_edge_batch(&mut self, edges: &[(u64, f64)], t: u64) -> EdgeIndexResult<usize> {
        let mut new_count = 0;
        for &(dest, weight) in edges {
            if self.insert_edge(dest, t, weight)? {
                new_count += 1;
            }
        }
        Ok(new_count)
    }

    fn edges<F>(&self, t: u64, mut cb: F) -> usize
    where
        F: FnMut(u64, f64) -> bool,
    {
        let snapshot = self.visible_snapshot(t);
        let mut count = 0;
        for (dest, weight) in snapshot {
            count += 1;
            if !cb(dest, weight) {
                break;
            }
        }
        count
    }

    fn intersect(&self, other: &Self, t: u64) -> usize {
        let mine: HashSet<u64> = self.visible_snapshot(t).into_iter().map(|(d, _)| d).collect();
        other
            .visible_snapshot(t)
            .into_iter()
            .filter(|(d, _)| mine.contains(d))
            .count()
    }

    fn iter(&self, t: u64) -> Self::Iter<'_> {
        self.visible_snapshot(t).into_iter()
    }

    fn init_bulk(edges: &[(u64, f64)], t: u64) -> Self {
        let mut dedup: HashMap<u64, f64> = HashMap::new();
        let mut order: Vec<u64> = Vec::new();
        for &(dest, weight) in edges {
            if dedup.insert(dest, weight).is_none() {
                order.push(dest);
            }
        }
        let mut block = Self::new();
        block.filter = BloomFilter::with_capacity(order.len());
        block.threshold = order.len().max(MIN_FILTER_CAPACITY);
        for dest in order {
            let weight = dedup[&dest];
            block.entries.push(BeginEndEntry::new(dest, weight, t));
            block.filter.insert(dest);
        }
        block
    }

    fn remove_edge(&mut self, dest: u64, t: u64) -> EdgeIndexResult<bool> {
        if let Some(pos) = self.find_latest_pos(dest) {
            if self.entries[pos].end == u64::MAX {
                self.entries[pos].update_version(t)?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bloom_filter_never_false_negatives() {
        let mut filter = BloomFilter::with_capacity(100);
        for d in 0..100u64 {
            filter.insert(d);
        }
        for d in 0..100u64 {
            assert!(filter.might_contain(d));
        }
    }

    #[test]
    fn insert_then_has_edge_true() {
        let mut log = LogBlock::new();
        assert!(log.insert_edge(5, 1, 2.5).unwrap());
        assert!(log.has_edge(5, 1));
        assert!(log.has_edge(5, 100));
        assert!(!log.has_edge(5, 0));
    }

    #[test]
    fn update_closes_old_entry_and_appends_new() {
        let mut log = LogBlock::new();
        log.insert_edge(5, 1, 1.0).unwrap();
        assert!(!log.insert_edge(5, 5, 2.0).unwrap());
        assert_eq!(log.len(), 2);
        assert!(!log.has_edge(5, 3)); // closed before t=5
        assert!(log.has_edge(5, 5));
        let mut seen = Vec::new();
        log.edges(5, |d, w| {
            seen.push((d, w));
            true
        });
        assert_eq!(seen, vec![(5, 2.0)]);
    }

    #[test]
    fn remove_then_reinsert_counts_as_new() {
        let mut log = LogBlock::new();
        log.insert_edge(9, 1, 1.0).unwrap();
        assert!(log.remove_edge(9, 2).unwrap());
        assert!(!log.has_edge(9, 2));
        assert!(log.insert_edge(9, 3, 9.0).unwrap());
        assert!(log.has_edge(9, 3));
    }

    #[test]
    fn filter_rebuilds_past_thresholds() {
        let mut log = LogBlock::new();
        for d in 0..300u64 {
            log.insert_edge(d, d + 1, 0.0).unwrap();
        }
        assert_eq!(log.threshold, 16 * 16 * 16 * 16);
        for d in 0..300u64 {
            assert!(log.has_edge(d, 300));
        }
    }

    #[test]
    fn intersect_counts_overlap_at_timestamp() {
        let mut a = LogBlock::new();
        let mut b = LogBlock::new();
        for d in 0..10u64 {
            a.insert_edge(d, 1, 0.0).unwrap();
        }
        for d in 5..15u64 {
            b.insert_edge(d, 1, 0.0).unwrap();
        }
        assert_eq!(a.intersect(&b, 10), 5);
    }
}
