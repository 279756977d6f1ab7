//! Sorted Array edge index — a dynamic ordered sequence of edge entries.

use crate::capability::EdgeIndex;
use crate::entry::VersionChainEntry;
use crate::error::EdgeIndexResult;

#[derive(Debug, Default)]
pub struct SortedArray {
    entries: Vec<VersionChainEntry>,
}

impl SortedArray {
    fn position(&self, dest: u64) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&dest, |e| e.dest)
    }
}

impl EdgeIndex for SortedArray {
    type Iter<'a> = SortedArrayIter<'a>;

    fn new() -> Self {
        Self::default()
    }

    fn has_edge(&self, dest: u64, t: u64) -> bool {
        match self.position(dest) {
            Ok(idx) => self.entries[idx].check_version(t),
            Err(_) => false,
        }
    }

    fn insert_edge(&mut self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        match self.position(dest) {
            Ok(idx) => {
                self.entries[idx].update_version(t, weight)?;
                Ok(false)
            }
            Err(idx) => {
                self.entries.insert(idx, VersionChainEntry::new(dest, weight, t));
                Ok(true)
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
        for e in &self.entries {
            if e.check_version(t) {
                count += 1;
                if !cb(e.dest, e.weight) {
                    break;
                }
            }
        }
        count
    }

    fn intersect(&self, other: &Self, t: u64) -> usize {
        let (mut i, mut j) = (0, 0);
        let mut count = 0;
        while i < self.entries.len() && j < other.entries.len() {
            let a = &self.entries[i];
            let b = &other.entries[j];
            match a.dest.cmp(&b.dest) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    if a.check_version(t) && b.check_version(t) {
                        count += 1;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    fn iter(&self, t: u64) -> Self::Iter<'_> {
        SortedArrayIter {
            inner: self.entries.iter(),
            t,
        }
    }

    fn init_bulk(edges: &[(u64, f64)], t: u64) -> Self {
        let mut dedup: Vec<(u64, f64)> = edges.to_vec();
        dedup.sort_unstable_by_key(|&(d, _)| d);
        dedup.dedup_by_key(|&mut (d, _)| d);
        let entries = dedup
            .into_iter()
            .map(|(d, w)| VersionChainEntry::new(d, w, t))
            .collect();
        Self { entries }
    }
}

pub struct SortedArrayIter<'a> {
    inner: std::slice::Iter<'a, VersionChainEntry>,
    t: u64,
}

impl Iterator for SortedArrayIter<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        for e in self.inner.by_ref() {
            if e.check_version(self.t) {
                return Some((e.dest, e.weight));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_ascending_order() {
        let mut idx = SortedArray::new();
        for d in [5, 1, 3, 2, 4] {
            assert!(idx.insert_edge(d, 1, 0.0).unwrap());
        }
        let dests: Vec<u64> = idx.iter(1).map(|(d, _)| d).collect();
        assert_eq!(dests, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn reinsert_is_not_a_new_edge() {
        let mut idx = SortedArray::new();
        assert!(idx.insert_edge(10, 1, 0.0).unwrap());
        assert!(!idx.insert_edge(10, 2, 1.0).unwrap());
        assert_eq!(idx.edges(10, |_, _| true), 1);
    }

    #[test]
    fn intersect_counts_visible_overlap() {
        let mut a = SortedArray::new();
        let mut b = SortedArray::new();
        for d in 0..10 {
            a.insert_edge(d, 1, 0.0).unwrap();
        }
        for d in 5..15 {
            b.insert_edge(d, 1, 0.0).unwrap();
        }
        assert_eq!(a.intersect(&b, 10), 5);
    }

    #[test]
    fn init_bulk_sorts_and_dedups() {
        let idx = SortedArray::init_bulk(&[(3, 0.0), (1, 0.0), (3, 1.0), (2, 0.0)], 1);
        let dests: Vec<u64> = idx.iter(1).map(|(d, _)| d).collect();
        assert_eq!(dests, vec![1, 2, 3]);
    }
}
