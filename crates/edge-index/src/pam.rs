//! PAM-style copy-on-write ordered map — an ordered map from "block key" to a sorted run of
//! destinations, plus a sorted header list. A destination `d` is a *header* iff `hash64(d) mod B
//! == 0`; its block key is `hash64(d) / B + 1`. `PRE_VEC_KEY = 0` holds every destination strictly
//! smaller than every header. Within any non-`PRE_VEC_KEY` block, every destination lies in
//! `[header, next_header)`. Every mutation builds a new root; blocks untouched by the mutation are
//! shared by bumping an `Arc` refcount rather than cloned, so a reader holding an old root keeps
//! seeing a perfectly consistent, unchanging view while writers race ahead.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capability::EdgeIndex;
use crate::entry::VersionChainEntry;
use crate::error::EdgeIndexResult;

/// Block-size parameter `B`: on average one destination in this many is a header.
const B: u64 = 64;

/// Destinations strictly smaller than every header live here, outside the header/block-key map.
const PRE_VEC_KEY: u64 = 0;

fn hash64(dest: u64) -> u64 {
    dest.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ dest.rotate_left(31)
}

fn is_header(dest: u64) -> bool {
    hash64(dest) % B == 0
}

fn block_key(header: u64) -> u64 {
    hash64(header) / B + 1
}

#[derive(Debug, Default)]
struct Root {
    /// Destinations below the smallest header.
    pre_vec: Arc<Vec<VersionChainEntry>>,
    /// Header destinations, sorted ascending — the true destination-order traversal path.
    headers: Arc<Vec<u64>>,
    /// Block key -> sorted entries for that header's block.
    blocks: Arc<BTreeMap<u64, Arc<Vec<VersionChainEntry>>>>,
}

impl Root {
    /// The greatest header `<= dest`, or `None` if `dest` belongs in `PRE_VEC_KEY`.
    fn floor_header(&self, dest: u64) -> Option<u64> {
        match self.headers.binary_search(&dest) {
            Ok(i) => Some(self.headers[i]),
            Err(0) => None,
            Err(i) => Some(self.headers[i - 1]),
        }
    }

    fn entries_for(&self, dest: u64) -> &[VersionChainEntry] {
        match self.floor_header(dest) {
            None => &self.pre_vec,
            Some(h) => self.blocks.get(&block_key(h)).map(|v| v.as_slice()).unwrap_or(&[]),
        }
    }
}

#[derive(Debug, Default)]
pub struct PamIndex {
    root: Arc<Root>,
}

/// Inserts-or-updates `dest` at its sorted position in `entries`. Returns whether it was newly
/// inserted (as opposed to an existing entry gaining a new version).
fn upsert_sorted(entries: &mut Vec<VersionChainEntry>, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
    match entries.binary_search_by_key(&dest, |e| e.dest) {
        Ok(pos) => {
            entries[pos].update_version(t, weight)?;
            Ok(false)
        }
        Err(pos) => {
            entries.insert(pos, VersionChainEntry::new(dest, weight, t));
            Ok(true)
        }
    }
}

fn insert_sorted_header(headers: &mut Vec<u64>, header: u64) {
    if let Err(pos) = headers.binary_search(&header) {
        headers.insert(pos, header);
    }
}

impl PamIndex {
    pub fn block_count(&self) -> usize {
        self.root.blocks.len() + 1
    }

    /// Applies one destination's insert/update against owned (already-cloned) root components,
    /// implementing the header/block-key split rules. Shared by `insert_edge` and
    /// `insert_edge_batch` so a whole batch commits as a single new root.
    fn apply_one(
        pre_vec: &mut Vec<VersionChainEntry>,
        headers: &mut Vec<u64>,
        blocks: &mut BTreeMap<u64, Arc<Vec<VersionChainEntry>>>,
        dest: u64,
        t: u64,
        weight: f64,
    ) -> EdgeIndexResult<bool> {
        let header_flag = is_header(dest);
        let floor = match headers.binary_search(&dest) {
            Ok(i) => Some(headers[i]),
            Err(0) => None,
            Err(i) => Some(headers[i - 1]),
        };

        match floor {
            None if header_flag => {
                // Step 2: d is a header and the found block is PRE_VEC_KEY. Elements >= d move to
                // a new block keyed by d's block key; PRE_VEC_KEY keeps the prefix.
                let split_at = pre_vec.partition_point(|e| e.dest < dest);
                let mut moved = pre_vec.split_off(split_at);
                let inserted = upsert_sorted(&mut moved, dest, t, weight)?;
                insert_sorted_header(headers, dest);
                blocks.insert(block_key(dest), Arc::new(moved));
                Ok(inserted)
            }
            None => {
                // Step 4: not a header, append at sorted position inside PRE_VEC_KEY.
                upsert_sorted(pre_vec, dest, t, weight)
            }
            Some(h) if header_flag && h != dest => {
                // Step 3: d is a header but the found block already starts with header h. Split
                // only when d falls strictly between h and the next element.
                let key = block_key(h);
                let mut block = blocks.get(&key).map(|b| (**b).clone()).unwrap_or_default();
                let split_at = block.partition_point(|e| e.dest < dest);
                let mut moved = block.split_off(split_at);
                let inserted = upsert_sorted(&mut moved, dest, t, weight)?;
                insert_sorted_header(headers, dest);
                blocks.insert(key, Arc::new(block));
                blocks.insert(block_key(dest), Arc::new(moved));
                Ok(inserted)
            }
            Some(h) => {
                // Step 4 (including d == h, an update to an existing header's own entry).
                let key = block_key(h);
                let mut block = blocks.get(&key).map(|b| (**b).clone()).unwrap_or_default();
                let inserted = upsert_sorted(&mut block, dest, t, weight)?;
                blocks.insert(key, Arc::new(block));
                Ok(inserted)
            }
        }
    }
}

impl EdgeIndex for PamIndex {
    type Iter<'a> = std::vec::IntoIter<(u64, f64)>;

    fn new() -> Self {
        Self::default()
    }

    fn has_edge(&self, dest: u64, t: u64) -> bool {
        let entries = self.root.entries_for(dest);
        entries
            .binary_search_by_key(&dest, |e| e.dest)
            .ok()
            .map(|pos| entries[pos].check_version(t))
            .unwrap_or(false)
    }

    fn insert_edge(&mut self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        let mut pre_vec = (*self.root.pre_vec).clone();
        let mut headers = (*self.root.headers).clone();
        let mut blocks = (*self.root.blocks).clone();
        let inserted = Self::apply_one(&mut pre_vec, &mut headers, &mut blocks, dest, t, weight)?;
        self.root = Arc::new(Root {
            pre_vec: Arc::new(pre_vec),
            headers: Arc::new(headers),
            blocks: Arc::new(blocks),
        });
        Ok(inserted)
    }

    /// Groups the sorted batch against the header/block-key scheme one destination at a time,
    /// same splitting rules as `insert_edge`, and commits the whole batch as a single new root.
    fn insert_edge_batch(&mut self, edges: &[(u64, f64)], t: u64) -> EdgeIndexResult<usize> {
        if edges.is_empty() {
            return Ok(0);
        }
        let mut sorted: Vec<(u64, f64)> = edges.to_vec();
        sorted.sort_unstable_by_key(|&(d, _)| d);
        sorted.dedup_by_key(|&mut (d, _)| d);

        let mut pre_vec = (*self.root.pre_vec).clone();
        let mut headers = (*self.root.headers).clone();
        let mut blocks = (*self.root.blocks).clone();

        let mut new_count = 0usize;
        for (dest, weight) in sorted {
            if Self::apply_one(&mut pre_vec, &mut headers, &mut blocks, dest, t, weight)? {
                new_count += 1;
            }
        }

        self.root = Arc::new(Root {
            pre_vec: Arc::new(pre_vec),
            headers: Arc::new(headers),
            blocks: Arc::new(blocks),
        });
        Ok(new_count)
    }

    fn edges<F>(&self, t: u64, mut cb: F) -> usize
    where
        F: FnMut(u64, f64) -> bool,
    {
        let mut count = 0;
        for e in self.root.pre_vec.iter() {
            if e.check_version(t) {
                count += 1;
                if !cb(e.dest, e.weight) {
                    return count;
                }
            }
        }
        for h in self.root.headers.iter() {
            let Some(block) = self.root.blocks.get(&block_key(*h)) else { continue };
            for e in block.iter() {
                if e.check_version(t) {
                    count += 1;
                    if !cb(e.dest, e.weight) {
                        return count;
                    }
                }
            }
        }
        count
    }

    /// Merge-walks the two visible-entry streams across both trees (including their `PRE_VEC_KEY`
    /// blocks); corrects a long-standing defect in the naive version of this join, which stubbed
    /// the result to 0 for this variant instead of actually merging.
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
        let mut out = Vec::new();
        out.extend(self.root.pre_vec.iter().filter(|e| e.check_version(t)).map(|e| (e.dest, e.weight)));
        for h in self.root.headers.iter() {
            if let Some(block) = self.root.blocks.get(&block_key(*h)) {
                out.extend(block.iter().filter(|e| e.check_version(t)).map(|e| (e.dest, e.weight)));
            }
        }
        out.into_iter()
    }

    fn init_bulk(edges: &[(u64, f64)], t: u64) -> Self {
        let mut idx = Self::new();
        idx.insert_edge_batch(edges, t).expect("init_bulk never revises an existing entry");
        idx
    }

    fn gc(&mut self, safe_t: u64) {
        let mut pre_vec = (*self.root.pre_vec).clone();
        for e in &mut pre_vec {
            e.gc(safe_t);
        }
        let blocks: BTreeMap<u64, Arc<Vec<VersionChainEntry>>> = self
            .root
            .blocks
            .iter()
            .map(|(&key, block)| {
                let mut entries = (**block).clone();
                for e in &mut entries {
                    e.gc(safe_t);
                }
                (key, Arc::new(entries))
            })
            .collect();
        self.root = Arc::new(Root {
            pre_vec: Arc::new(pre_vec),
            headers: self.root.headers.clone(),
            blocks: Arc::new(blocks),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_destinations_land_in_their_own_block() {
        let header = (0..10_000).find(|&d| is_header(d)).expect("some destination is a header under B=64");
        let mut idx = PamIndex::new();
        idx.insert_edge(header, 1, 0.0).unwrap();
        assert!(idx.root.headers.contains(&header));
        assert!(idx.has_edge(header, 1));
    }

    #[test]
    fn non_header_destinations_below_every_header_land_in_pre_vec() {
        let mut idx = PamIndex::new();
        let non_header = (0..10_000).find(|&d| !is_header(d)).unwrap();
        idx.insert_edge(non_header, 1, 0.0).unwrap();
        assert!(idx.root.headers.is_empty());
        assert!(idx.has_edge(non_header, 1));
    }

    #[test]
    fn old_root_unaffected_by_later_mutation() {
        let mut idx = PamIndex::new();
        idx.insert_edge(1, 1, 0.0).unwrap();
        let old_root = idx.root.clone();
        idx.insert_edge(2, 2, 0.0).unwrap();
        assert!(old_root.entries_for(2).binary_search_by_key(&2, |e| e.dest).is_err());
        assert!(idx.has_edge(2, 2));
    }

    #[test]
    fn every_destination_respects_header_block_boundaries() {
        let mut idx = PamIndex::new();
        for d in 0..5000u64 {
            idx.insert_edge(d, 1, 0.0).unwrap();
        }
        let headers = (*idx.root.headers).clone();
        for w in 0..headers.len() {
            let lo = headers[w];
            let hi = headers.get(w + 1).copied();
            let block = idx.root.blocks.get(&block_key(lo)).unwrap();
            for e in block.iter() {
                assert!(e.dest >= lo);
                if let Some(hi) = hi {
                    assert!(e.dest < hi, "dest {} should be < next header {}", e.dest, hi);
                }
            }
        }
        if let Some(&first_header) = headers.first() {
            for e in idx.root.pre_vec.iter() {
                assert!(e.dest < first_header);
            }
        }
    }

    #[test]
    fn batch_and_single_insert_agree() {
        let mut via_batch = PamIndex::new();
        let edges: Vec<(u64, f64)> = (0..5000).map(|d| (d, d as f64)).collect();
        via_batch.insert_edge_batch(&edges, 1).unwrap();

        let mut via_single = PamIndex::new();
        for &(d, w) in &edges {
            via_single.insert_edge(d, 1, w).unwrap();
        }

        let a: Vec<(u64, f64)> = via_batch.iter(1).collect();
        let b: Vec<(u64, f64)> = via_single.iter(1).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn intersect_matches_brute_force() {
        let mut a = PamIndex::new();
        let mut b = PamIndex::new();
        a.insert_edge_batch(&(0..1000).map(|d| (d, 0.0)).collect::<Vec<_>>(), 1).unwrap();
        b.insert_edge_batch(&(500..1500).map(|d| (d, 0.0)).collect::<Vec<_>>(), 1).unwrap();
        assert_eq!(a.intersect(&b, 1), 500);
    }

    #[test]
    fn init_bulk_round_trip() {
        let edges: Vec<(u64, f64)> = (0..5000).map(|d| (d, d as f64)).collect();
        let idx = PamIndex::init_bulk(&edges, 1);
        let got: Vec<u64> = idx.iter(1).map(|(d, _)| d).collect();
        assert_eq!(got, (0..5000).collect::<Vec<_>>());
    }

    #[test]
    fn gc_trims_old_versions_without_losing_visibility() {
        let mut idx = PamIndex::new();
        idx.insert_edge(1, 1, 0.0).unwrap();
        idx.insert_edge(1, 5, 1.0).unwrap();
        idx.insert_edge(1, 10, 2.0).unwrap();
        idx.gc(7);
        assert!(idx.has_edge(1, 10));
        assert!(idx.has_edge(1, 6));
    }
}
