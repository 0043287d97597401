//! Disjoint, duplicate-free out-of-sample sets.
//!
//! Matching is exact componentwise `f64` equality. Continuous quasi-random and
//! uniform draws almost never collide, so in practice nearly every candidate
//! survives; near-duplicates within any tolerance are kept on purpose.

#![allow(missing_docs)]

use std::collections::HashSet;

use crate::core::errors::{AsbError, Result};
use crate::core::space::DesignPoint;

/// Hashable identity of a point under `==` semantics (`-0.0` folds onto `0.0`).
fn point_key(point: &[f64]) -> Vec<u64> {
    point.iter().map(|&v| (v + 0.0).to_bits()).collect()
}

/// Keep the first `keep` pool points that match no excluded point and no earlier
/// surviving pool point, in original pool order.
///
/// The pool is consumed lazily, so an unbounded candidate stream stops being
/// drawn once `keep` points survive.
///
/// Fails with [`AsbError::InsufficientPool`] rather than returning a short set.
pub fn filter_disjoint(
    pool: impl IntoIterator<Item = DesignPoint>,
    exclude: &[DesignPoint],
    keep: usize,
) -> Result<Vec<DesignPoint>> {
    let excluded: HashSet<Vec<u64>> = exclude.iter().map(|p| point_key(p)).collect();
    let mut seen: HashSet<Vec<u64>> = HashSet::with_capacity(keep);
    let mut kept = Vec::with_capacity(keep);

    for point in pool {
        if kept.len() == keep {
            break;
        }
        let key = point_key(&point);
        if excluded.contains(&key) || !seen.insert(key) {
            continue;
        }
        kept.push(point);
    }

    if kept.len() < keep {
        return Err(AsbError::InsufficientPool {
            required: keep,
            available: kept.len(),
            shortfall: keep - kept.len(),
        });
    }
    Ok(kept)
}
