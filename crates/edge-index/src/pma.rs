//! Packed Memory Array edge index — a sparse, globally-ordered array of segments kept below a
//! level-dependent density threshold by local rebalancing, falling back to a full-capacity
//! doubling when even the whole array is too dense.

use crate::capability::EdgeIndex;
use crate::entry::VersionChainEntry;
use crate::error::EdgeIndexResult;

const DEFAULT_SEGMENT_SIZE: usize = 64;

#[derive(Debug)]
pub struct Pma {
    segment_size: usize,
    segments: Vec<Vec<VersionChainEntry>>,
}

impl Pma {
    /// Creates a PMA with the given per-segment capacity and an initial total capacity (rounded
    /// up to the next power-of-two multiple of `segment_size`).
    pub fn with_capacity(segment_size: usize, initial_capacity: usize) -> Self {
        let segment_size = segment_size.max(1);
        let mut num_segments = (initial_capacity / segment_size).max(1);
        if !num_segments.is_power_of_two() {
            num_segments = num_segments.next_power_of_two();
        }
        Self {
            segment_size,
            segments: (0..num_segments).map(|_| Vec::new()).collect(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn total_capacity(&self) -> usize {
        self.segments.len() * self.segment_size
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every window's density must stay below this threshold at its level.
    fn density_threshold(&self, level: u32) -> f64 {
        let log2c = (self.total_capacity() as f64).log2().max(1.0);
        1.0 - 0.5 * (level as f64) / log2c
    }

    /// Binary-searches segment boundaries for the segment whose range contains `dest`: the
    /// leftmost non-empty segment whose max key is `>= dest`, or the last segment if none is.
    /// Segment maxes are non-decreasing left to right, but a segment itself may be empty (a gap),
    /// so the probe at `mid` compares against the nearest non-empty segment at or after `mid`
    /// rather than `mid`'s own (possibly absent) max.
    fn find_segment(&self, dest: u64) -> usize {
        let n = self.segments.len();
        let bound_from = |i: usize| -> Option<u64> { self.segments[i..].iter().find_map(|seg| seg.last().map(|e| e.dest)) };

        let mut lo = 0;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match bound_from(mid) {
                Some(bound) if dest <= bound => hi = mid,
                _ => lo = mid + 1,
            }
        }
        if lo >= n {
            return n - 1;
        }
        (lo..n).find(|&i| !self.segments[i].is_empty()).unwrap_or(n - 1)
    }

    fn rebalance_window(&mut self, start: usize, end: usize) {
        let mut all: Vec<VersionChainEntry> = Vec::new();
        for seg in &mut self.segments[start..end] {
            all.append(seg);
        }
        let window_segments = end - start;
        let n = all.len();
        let base = n / window_segments;
        let rem = n % window_segments;
        let mut iter = all.into_iter();
        for (i, seg) in self.segments[start..end].iter_mut().enumerate() {
            let take = base + usize::from(i < rem);
            seg.extend(iter.by_ref().take(take));
        }
    }

    fn resize_capacity(&mut self) {
        let old_num_segments = self.segments.len();
        let new_num_segments = (old_num_segments * 2).max(2);
        self.segments.resize_with(new_num_segments, Vec::new);
        self.rebalance_window(0, new_num_segments);
    }

    /// Finds the smallest window containing `seg_idx` whose density is under threshold and
    /// rebalances it; doubles total capacity if no such window exists.
    fn grow_to_fit(&mut self, seg_idx: usize) {
        let num_segments = self.segments.len();
        let max_level = num_segments.ilog2();
        let mut level = 1u32;
        while level <= max_level {
            let window_size = 1usize << level;
            let window_id = seg_idx / window_size;
            let start = window_id * window_size;
            let end = (start + window_size).min(num_segments);
            let count: usize = self.segments[start..end].iter().map(Vec::len).sum();
            let capacity = (end - start) * self.segment_size;
            let density = count as f64 / capacity as f64;
            if density < self.density_threshold(level) {
                self.rebalance_window(start, end);
                return;
            }
            level += 1;
        }
        self.resize_capacity();
    }

    /// Verifies that every window at every level is below its density threshold. Used by tests;
    /// not on the hot path.
    pub fn check_density_invariant(&self) -> bool {
        let num_segments = self.segments.len();
        let max_level = num_segments.ilog2();
        for level in 1..=max_level {
            let window_size = 1usize << level;
            for start in (0..num_segments).step_by(window_size) {
                let end = (start + window_size).min(num_segments);
                let count: usize = self.segments[start..end].iter().map(Vec::len).sum();
                let capacity = (end - start) * self.segment_size;
                if count as f64 / capacity as f64 >= self.density_threshold(level) {
                    return false;
                }
            }
        }
        true
    }
}

impl EdgeIndex for Pma {
    type Iter<'a> = PmaIter<'a>;

    fn new() -> Self {
        Self::with_capacity(DEFAULT_SEGMENT_SIZE, DEFAULT_SEGMENT_SIZE)
    }

    fn has_edge(&self, dest: u64, t: u64) -> bool {
        let seg_idx = self.find_segment(dest);
        let seg = &self.segments[seg_idx];
        match seg.binary_search_by_key(&dest, |e| e.dest) {
            Ok(pos) => seg[pos].check_version(t),
            Err(_) => false,
        }
    }

    fn insert_edge(&mut self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        let seg_idx = self.find_segment(dest);
        let pos = self.segments[seg_idx].binary_search_by_key(&dest, |e| e.dest);
        match pos {
            Ok(pos) => {
                self.segments[seg_idx][pos].update_version(t, weight)?;
                Ok(false)
            }
            Err(pos) => {
                if self.segments[seg_idx].len() < self.segment_size {
                    self.segments[seg_idx].insert(pos, VersionChainEntry::new(dest, weight, t));
                    Ok(true)
                } else {
                    self.grow_to_fit(seg_idx);
                    self.insert_edge(dest, t, weight)
                }
            }
        }
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
        let mut count = 0;
        'outer: for seg in &self.segments {
            for e in seg {
                if e.check_version(t) {
                    count += 1;
                    if !cb(e.dest, e.weight) {
                        break 'outer;
                    }
                }
            }
        }
        count
    }

    fn intersect(&self, other: &Self, t: u64) -> usize {
        let mut a = self.iter(t).peekable();
        let mut b = other.iter(t).peekable();
        let mut count = 0;
        loop {
            match (a.peek(), b.peek()) {
                (Some(&(da, _)), Some(&(db, _))) => match da.cmp(&db) {
                    std::cmp::Ordering::Less => {
                        a.next();
                    }
                    std::cmp::Ordering::Greater => {
                        b.next();
                    }
                    std::cmp::Ordering::Equal => {
                        count += 1;
                        a.next();
                        b.next();
                    }
                },
                _ => break,
            }
        }
        count
    }

    fn iter(&self, t: u64) -> Self::Iter<'_> {
        PmaIter {
            segments: &self.segments,
            seg_idx: 0,
            entry_idx: 0,
            t,
        }
    }

    fn init_bulk(edges: &[(u64, f64)], t: u64) -> Self {
        let mut dedup: Vec<(u64, f64)> = edges.to_vec();
        dedup.sort_unstable_by_key(|&(d, _)| d);
        dedup.dedup_by_key(|&mut (d, _)| d);

        let segment_size = DEFAULT_SEGMENT_SIZE;
        // Pack at ~50% density so subsequent inserts don't immediately trigger a rebalance.
        let target_capacity = (dedup.len() * 2).max(segment_size);
        let mut pma = Self::with_capacity(segment_size, target_capacity);
        let num_segments = pma.segments.len();
        let n = dedup.len();
        let base = n / num_segments;
        let rem = n % num_segments;
        let mut iter = dedup.into_iter();
        for (i, seg) in pma.segments.iter_mut().enumerate() {
            let take = base + usize::from(i < rem);
            seg.extend(iter.by_ref().take(take).map(|(d, w)| VersionChainEntry::new(d, w, t)));
        }
        pma
    }
}

pub struct PmaIter<'a> {
    segments: &'a [Vec<VersionChainEntry>],
    seg_idx: usize,
    entry_idx: usize,
    t: u64,
}

impl Iterator for PmaIter<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.seg_idx < self.segments.len() {
            let seg = &self.segments[self.seg_idx];
            while self.entry_idx < seg.len() {
                let e = &seg[self.entry_idx];
                self.entry_idx += 1;
                if e.check_version(self.t) {
                    return Some((e.dest, e.weight));
                }
            }
            self.seg_idx += 1;
            self.entry_idx = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::seq::SliceRandom;

    use super::*;

    #[test]
    fn insert_and_scan_round_trip() {
        let mut pma = Pma::with_capacity(8, 8);
        let mut dests: Vec<u64> = (0..500).collect();
        dests.shuffle(&mut rand::rng());
        for (i, &d) in dests.iter().enumerate() {
            assert!(pma.insert_edge(d, i as u64 + 1, 0.0).unwrap());
        }
        let mut seen: Vec<u64> = Vec::new();
        pma.edges(u64::MAX, |d, _| {
            seen.push(d);
            true
        });
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
        assert!(pma.check_density_invariant());
    }

    #[test]
    fn density_stays_under_threshold_with_random_inserts() {
        let mut pma = Pma::with_capacity(64, 1024);
        let mut rng = rand::rng();
        let mut dests: Vec<u64> = (0..10_000).collect();
        dests.shuffle(&mut rng);
        let mut resized_segments = pma.segment_count();
        let mut resize_events = 0;
        for (i, &d) in dests.iter().enumerate() {
            pma.insert_edge(d, i as u64 + 1, 0.0).unwrap();
            assert!(pma.check_density_invariant());
            if pma.segment_count() != resized_segments {
                resize_events += 1;
                resized_segments = pma.segment_count();
            }
        }
        assert!(resize_events >= 3, "expected >=3 resizes, got {resize_events}");
    }

    #[test]
    fn reinsert_updates_version_not_count() {
        let mut pma = Pma::with_capacity(8, 8);
        assert!(pma.insert_edge(1, 1, 0.0).unwrap());
        assert!(!pma.insert_edge(1, 2, 5.0).unwrap());
        assert_eq!(pma.len(), 1);
    }

    #[test]
    fn init_bulk_round_trip() {
        let edges: Vec<(u64, f64)> = (0..300).map(|d| (d, d as f64)).collect();
        let pma = Pma::init_bulk(&edges, 1);
        let got: Vec<u64> = pma.iter(1).map(|(d, _)| d).collect();
        assert_eq!(got, (0..300).collect::<Vec<_>>());
    }
}
