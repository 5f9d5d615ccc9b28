//! Min-max normalization of suitability rasters.

use crate::tilemap::Tilemap;

/// Smallest range used as divisor; flatter maps normalize to zero.
pub const NORMALIZATION_EPSILON: f32 = 1e-6;

/// Scale all cells to `[0, 1]` via `(v - min) / max(max - min, 1e-6)`.
///
/// NaN cells stay NaN.
pub fn normalize_map(map: &Tilemap<f32>) -> Tilemap<f32> {
    let Some((min_v, max_v)) = map.min_max() else {
        return map.clone();
    };
    let range = divisor(min_v, max_v);
    map.map(|&v| (v - min_v) / range)
}

/// Normalize only the cells where `include` is true; every other cell becomes 0.
///
/// Minimum and maximum are taken over the included cells alone.
pub fn normalize_masked(map: &Tilemap<f32>, include: &Tilemap<bool>) -> Tilemap<f32> {
    let mut min_v = f32::MAX;
    let mut max_v = f32::MIN;
    let mut any = false;
    for (v, &inc) in map.values().zip(include.values()) {
        if !inc || v.is_nan() {
            continue;
        }
        any = true;
        if *v < min_v { min_v = *v; }
        if *v > max_v { max_v = *v; }
    }

    if !any {
        return Tilemap::new_with(map.width, map.height, 0.0);
    }

    let range = divisor(min_v, max_v);
    map.zip_map(include, |&v, &inc| if inc { (v - min_v) / range } else { 0.0 })
}

fn divisor(min_v: f32, max_v: f32) -> f32 {
    let range = max_v - min_v;
    if range < NORMALIZATION_EPSILON {
        NORMALIZATION_EPSILON
    } else {
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bounds_and_order() {
        let values = vec![5.0, -2.0, 17.5, 3.25, 3.0, 100.0, 0.0, -40.0, 12.0];
        let map = Tilemap::from_vec(3, 3, values.clone()).unwrap();
        let norm = normalize_map(&map);

        for &v in norm.values() {
            assert!((0.0..=1.0).contains(&v));
        }
        // Rank order preserved: no inversions
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] < values[j] {
                    assert!(norm.get_index(i) < norm.get_index(j));
                }
            }
        }
        assert_eq!(norm.min_max(), Some((0.0, 1.0)));
    }

    #[test]
    fn test_degenerate_map_uses_epsilon() {
        let map = Tilemap::new_with(4, 4, 0.75f32);
        let norm = normalize_map(&map);
        assert!(norm.values().all(|&v| v == 0.0));

        // Range below epsilon divides by epsilon instead of the true range
        let tiny = Tilemap::from_vec(2, 1, vec![0.0, 5e-7]).unwrap();
        let norm = normalize_map(&tiny);
        assert!((norm.get(1, 0) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_masked_normalization_zeroes_excluded() {
        let map = Tilemap::from_vec(4, 1, vec![1.0, 2.0, 3.0, 1000.0]).unwrap();
        let include = Tilemap::from_vec(4, 1, vec![true, true, true, false]).unwrap();
        let norm = normalize_masked(&map, &include);
        assert_eq!(norm.as_slice(), &[0.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_masked_normalization_empty_mask() {
        let map = Tilemap::new_with(2, 2, 3.0f32);
        let include = Tilemap::new_with(2, 2, false);
        assert!(normalize_masked(&map, &include).values().all(|&v| v == 0.0));
    }
}
