//! Triangle counting, in two variants. Both require neighbor lists ordered ascending by
//! destination (true for every edge-index variant except the log-block, which is append-ordered
//! and is not a valid backing store for these kernels).
//!
//! - [`count_via_intersect`]: for each edge `(u, v)` with `v > u`, add `|N(u) ∩ N(v)|` using the
//!   index's own set-intersection primitive.
//! - [`count_via_merge`]: for each edge `(u, v)` with `v <= u`, merge-walks `N(u)` and `N(v)`
//!   directly via the callback API rather than delegating to `intersect`.

use crate::{GraphView, KernelResult};

pub fn count_via_intersect<G: GraphView>(view: &G) -> KernelResult<u64> {
    let size = view.vertex_count();
    let mut total = 0u64;
    for u in 0..size {
        let mut inner_err = None;
        view.edges(u, &mut |v, _weight| {
            if v > u {
                match view.intersect(u, v) {
                    Ok(count) => total += count as u64,
                    Err(e) => {
                        inner_err = Some(e);
                        return false;
                    }
                }
            }
            true
        })?;
        if let Some(e) = inner_err {
            return Err(e);
        }
    }
    Ok(total / 3)
}

pub fn count_via_merge<G: GraphView>(view: &G) -> KernelResult<u64> {
    let size = view.vertex_count();
    let mut total = 0u64;

    for n1 in 0..size {
        let mut neighbors = Vec::new();
        let mut inner_err = None;
        view.edges(n1, &mut |n2, _weight| {
            if n2 > n1 {
                return false;
            }
            neighbors.push(n2);

            let mut marker = 0usize;
            let merge_result = view.edges(n2, &mut |n3, _weight| {
                if n3 > n2 {
                    return false;
                }
                while marker < neighbors.len() && n3 > neighbors[marker] {
                    marker += 1;
                }
                if marker >= neighbors.len() {
                    return false;
                }
                if n3 == neighbors[marker] {
                    total += 1;
                    marker += 1;
                }
                marker < neighbors.len()
            });
            if let Err(e) = merge_result {
                inner_err = Some(e);
                return false;
            }
            true
        })?;
        if let Some(e) = inner_err {
            return Err(e);
        }
    }

    Ok(total)
}
