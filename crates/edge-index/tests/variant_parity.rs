//! All five `EdgeIndex` variants must agree on visible contents and intersection counts given the
//! same sequence of inserts, regardless of their very different internal layouts.

use graphbench_edge_index::{EdgeIndex, LogBlock, PamIndex, Pma, SkipListIndex, SortedArray};

fn build<I: EdgeIndex>(dests: &[u64]) -> I {
    let mut idx = I::new();
    for (i, &d) in dests.iter().enumerate() {
        idx.insert_edge(d, i as u64 + 1, d as f64).unwrap();
    }
    idx
}

fn visible<I: EdgeIndex>(idx: &I, t: u64) -> Vec<u64> {
    let mut out: Vec<u64> = idx.iter(t).map(|(d, _)| d).collect();
    out.sort_unstable();
    out
}

#[test]
fn all_variants_agree_on_visible_set() {
    let mut dests: Vec<u64> = (0..3000).collect();
    // A non-sorted insertion order exercises each variant's internal reordering logic.
    let mut shuffled = dests.clone();
    shuffled.reverse();
    dests.truncate(0);
    dests.extend(shuffled);

    let sorted = build::<SortedArray>(&dests);
    let pma = build::<Pma>(&dests);
    let skip = build::<SkipListIndex>(&dests);
    let log = build::<LogBlock>(&dests);
    let pam = build::<PamIndex>(&dests);

    let t = dests.len() as u64;
    let expected: Vec<u64> = {
        let mut v: Vec<u64> = dests.clone();
        v.sort_unstable();
        v
    };

    assert_eq!(visible(&sorted, t), expected);
    assert_eq!(visible(&pma, t), expected);
    assert_eq!(visible(&skip, t), expected);
    assert_eq!(visible(&log, t), expected);
    assert_eq!(visible(&pam, t), expected);
}

#[test]
fn all_variants_agree_on_intersection_count() {
    let a_dests: Vec<u64> = (0..800).collect();
    let b_dests: Vec<u64> = (400..1200).collect();
    let t = 10_000;

    let a_sorted = build::<SortedArray>(&a_dests);
    let b_sorted = build::<SortedArray>(&b_dests);
    let a_pma = build::<Pma>(&a_dests);
    let b_pma = build::<Pma>(&b_dests);
    let a_skip = build::<SkipListIndex>(&a_dests);
    let b_skip = build::<SkipListIndex>(&b_dests);
    let a_log = build::<LogBlock>(&a_dests);
    let b_log = build::<LogBlock>(&b_dests);
    let a_pam = build::<PamIndex>(&a_dests);
    let b_pam = build::<PamIndex>(&b_dests);

    assert_eq!(a_sorted.intersect(&b_sorted, t), 400);
    assert_eq!(a_pma.intersect(&b_pma, t), 400);
    assert_eq!(a_skip.intersect(&b_skip, t), 400);
    assert_eq!(a_log.intersect(&b_log, t), 400);
    assert_eq!(a_pam.intersect(&b_pam, t), 400);
}

#[test]
fn all_variants_hide_edges_before_their_commit_timestamp() {
    let mut sorted = SortedArray::new();
    let mut pma = Pma::new();
    let mut skip = SkipListIndex::new();
    let mut log = LogBlock::new();
    let mut pam = PamIndex::new();

    sorted.insert_edge(1, 100, 0.0).unwrap();
    pma.insert_edge(1, 100, 0.0).unwrap();
    skip.insert_edge(1, 100, 0.0).unwrap();
    log.insert_edge(1, 100, 0.0).unwrap();
    pam.insert_edge(1, 100, 0.0).unwrap();

    assert!(!sorted.has_edge(1, 50));
    assert!(!pma.has_edge(1, 50));
    assert!(!skip.has_edge(1, 50));
    assert!(!log.has_edge(1, 50));
    assert!(!pam.has_edge(1, 50));

    assert!(sorted.has_edge(1, 100));
    assert!(pma.has_edge(1, 100));
    assert!(skip.has_edge(1, 100));
    assert!(log.has_edge(1, 100));
    assert!(pam.has_edge(1, 100));
}
