//! Rank ordering of candidate cells.
//!
//! Ranks are 1-based and ascending: the least suitable candidate has rank 1,
//! the most suitable has `rank_max`. Equal values are ordered by cell index
//! so the ordering is total even without noise.

use crate::tilemap::Tilemap;

/// Row-major cell position.
pub type CellIndex = usize;

/// Candidate cell indices sorted by ascending value.
///
/// Element `i` of the result holds rank `i + 1`.
pub fn order_ascending(values: &Tilemap<f32>, candidates: &Tilemap<bool>) -> Vec<CellIndex> {
    let mut order: Vec<CellIndex> = candidates
        .values()
        .enumerate()
        .filter_map(|(idx, &c)| c.then_some(idx))
        .collect();

    order.sort_by(|&a, &b| {
        values
            .get_index(a)
            .total_cmp(values.get_index(b))
            .then(a.cmp(&b))
    });
    order
}

/// Rank raster: candidate cells get their 1-based rank, all others 0.
pub fn rank_map(values: &Tilemap<f32>, candidates: &Tilemap<bool>) -> Tilemap<u32> {
    let mut ranks = Tilemap::new_with(values.width, values.height, 0u32);
    for (position, idx) in order_ascending(values, candidates).into_iter().enumerate() {
        ranks.set_index(idx, position as u32 + 1);
    }
    ranks
}

/// The cells with `rank > rank_max - count`, i.e. the `count` most suitable.
///
/// The threshold is clamped at zero, so a pool with fewer candidates than
/// `count` hands out every candidate it has.
pub fn select_highest(values: &Tilemap<f32>, candidates: &Tilemap<bool>, count: usize) -> Vec<CellIndex> {
    let order = order_ascending(values, candidates);
    let rank_max = order.len();
    let threshold = rank_max.saturating_sub(count);
    order[threshold..].to_vec()
}

/// The `count` least suitable candidates (ranks `1..=count`).
pub fn select_lowest(values: &Tilemap<f32>, candidates: &Tilemap<bool>, count: usize) -> Vec<CellIndex> {
    let mut order = order_ascending(values, candidates);
    order.truncate(count);
    order
}
