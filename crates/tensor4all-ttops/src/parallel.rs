//! Fan-out over independent cores, batch items and queries

use crate::error::Result;
use rayon::prelude::*;

/// Minimum number of independent work items before work is spread over the
/// rayon thread pool
pub const PARALLEL_THRESHOLD: usize = 4;

/// Evaluate `f(0), ..., f(n - 1)`, in parallel when `n >= PARALLEL_THRESHOLD`.
/// Results keep index order.
pub(crate) fn map_indexed<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    if n >= PARALLEL_THRESHOLD {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// Fallible [`map_indexed`]; the first error in index order is returned
pub(crate) fn try_map_indexed<R, F>(n: usize, f: F) -> Result<Vec<R>>
where
    R: Send,
    F: Fn(usize) -> Result<R> + Sync + Send,
{
    if n >= PARALLEL_THRESHOLD {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}
