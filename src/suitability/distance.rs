//! Distance spreading over the raster.

use std::collections::VecDeque;

use crate::tilemap::Tilemap;

const DIAGONAL: f32 = std::f32::consts::SQRT_2;

/// Distance from every cell to the nearest source cell, in world units.
///
/// Spreads over the 8-connected grid; a straight step costs
/// `cell_size * friction`, a diagonal step `sqrt(2)` times that. Cells that
/// cannot be reached (no sources at all) are `f32::INFINITY`.
pub fn spread_distance(sources: &Tilemap<bool>, cell_size: f32, friction: f32) -> Tilemap<f32> {
    let width = sources.width;
    let height = sources.height;
    let step = cell_size * friction;

    let mut distance = Tilemap::new_with(width, height, f32::INFINITY);
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for (x, y, &is_source) in sources.iter() {
        if is_source {
            distance.set(x, y, 0.0);
            queue.push_back((x, y));
        }
    }

    // Relax until no distance improves
    while let Some((x, y)) = queue.pop_front() {
        let dist = *distance.get(x, y);
        for (nx, ny) in distance.neighbors_8(x, y) {
            let cost = if nx != x && ny != y { step * DIAGONAL } else { step };
            let new_dist = dist + cost;
            if new_dist < *distance.get(nx, ny) {
                distance.set(nx, ny, new_dist);
                queue.push_back((nx, ny));
            }
        }
    }

    distance
}
