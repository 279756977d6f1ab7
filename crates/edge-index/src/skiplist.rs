//! Skip List of edge blocks — a `crossbeam_skiplist::SkipMap` keyed by each block's minimum
//! destination, where every value is a fixed-capacity sorted run of entries. The skip list's own
//! level generation (geometric, p=0.5) comes straight from `crossbeam_skiplist`; we only own the
//! block-splitting policy on top of it.

use std::ops::Bound;

use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;

use crate::capability::EdgeIndex;
use crate::entry::VersionChainEntry;
use crate::error::EdgeIndexResult;

const BLOCK_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Block {
    entries: Vec<VersionChainEntry>,
}

#[derive(Debug, Default)]
pub struct SkipListIndex {
    blocks: SkipMap<u64, RwLock<Block>>,
}

impl SkipListIndex {
    /// Key of the block that would own `dest`: the greatest block-min `<= dest`, or the very
    /// first block if `dest` is smaller than every block's minimum.
    fn floor_key(&self, dest: u64) -> Option<u64> {
        if let Some(entry) = self.blocks.upper_bound(Bound::Included(&dest)) {
            return Some(*entry.key());
        }
        self.blocks.front().map(|entry| *entry.key())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl EdgeIndex for SkipListIndex {
    type Iter<'a> = std::vec::IntoIter<(u64, f64)>;

    fn new() -> Self {
        Self::default()
    }

    fn has_edge(&self, dest: u64, t: u64) -> bool {
        let Some(key) = self.floor_key(dest) else {
            return false;
        };
        let Some(entry) = self.blocks.get(&key) else {
            return false;
        };
        let block = entry.value().read();
        match block.entries.binary_search_by_key(&dest, |e| e.dest) {
            Ok(pos) => block.entries[pos].check_version(t),
            Err(_) => false,
        }
    }

    fn insert_edge(&mut self, dest: u64, t: u64, weight: f64) -> EdgeIndexResult<bool> {
        let Some(key) = self.floor_key(dest) else {
            let mut block = Block::default();
            block.entries.push(VersionChainEntry::new(dest, weight, t));
            self.blocks.insert(dest, RwLock::new(block));
            return Ok(true);
        };
        let entry = self.blocks.get(&key).expect("floor_key must resolve to a live block");
        let mut block = entry.value().write();
        match block.entries.binary_search_by_key(&dest, |e| e.dest) {
            Ok(pos) => {
                block.entries[pos].update_version(t, weight)?;
                Ok(false)
            }
            Err(pos) => {
                if block.entries.len() < BLOCK_CAPACITY {
                    block.entries.insert(pos, VersionChainEntry::new(dest, weight, t));
                    Ok(true)
                } else {
                    let mut all = std::mem::take(&mut block.entries);
                    all.insert(pos, VersionChainEntry::new(dest, weight, t));
                    let mid = all.len() / 2;
                    let upper = all.split_off(mid);
                    block.entries = all;
                    drop(block);
                    let upper_key = upper[0].dest;
                    self.blocks.insert(upper_key, RwLock::new(Block { entries: upper }));
                    Ok(true)
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
        for block_entry in self.blocks.iter() {
            let block = block_entry.value().read();
            for e in &block.entries {
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

    fn intersect(&self, other: &Self, t: u64) -> usize {
        let a: Vec<(u64, f64)> = self.iter(t).collect();
        let b: Vec<(u64, f64)> = other.iter(t).collect();
        let (mut i, mut j) = (0, 0);
        let mut count = 0;
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    fn iter(&self, t: u64) -> Self::Iter<'_> {
        let mut snapshot = Vec::new();
        for block_entry in self.blocks.iter() {
            let block = block_entry.value().read();
            snapshot.extend(block.entries.iter().filter(|e| e.check_version(t)).map(|e| (e.dest, e.weight)));
        }
        snapshot.into_iter()
    }

    fn init_bulk(edges: &[(u64, f64)], t: u64) -> Self {
        let mut dedup: Vec<(u64, f64)> = edges.to_vec();
        dedup.sort_unstable_by_key(|&(d, _)| d);
        dedup.dedup_by_key(|&mut (d, _)| d);

        let blocks = SkipMap::new();
        for chunk in dedup.chunks(BLOCK_CAPACITY) {
            let key = chunk[0].0;
            let entries = chunk.iter().map(|&(d, w)| VersionChainEntry::new(d, w, t)).collect();
            blocks.insert(key, RwLock::new(Block { entries }));
        }
        Self { blocks }
    }

    fn gc(&mut self, safe_t: u64) {
        for block_entry in self.blocks.iter() {
            let mut block = block_entry.value().write();
            for e in &mut block.entries {
                e.gc(safe_t);
            }
        }
    }
}
