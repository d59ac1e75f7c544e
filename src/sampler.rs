//! Grid sampling and percentile statistics over a flow field.
//!
//! Sampling strides the grid so that at most ~32 columns are visited
//! regardless of model resolution. Percentiles use nearest-rank indexing,
//! not linear interpolation; the same rule aggregates the per-pair velocity
//! sequence downstream.

use crate::model::FlowField;

/// Bound on grid columns visited while sampling statistics.
const STAT_GRID: usize = 32;

/// Magnitude statistics over a strided subsample of a flow field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MagnitudeStats {
    pub median: f32,
    pub p90: f32,
    pub max: f32,
}

/// Nearest-rank percentile over an ascending-sorted slice.
///
/// For `p` in [0,1], `index = clamp(floor(p * (n-1)), 0, n-1)`. An empty
/// slice yields the zero value for every `p`.
pub fn percentile<T: Copy + Default>(sorted: &[T], p: f64) -> T {
    if sorted.is_empty() {
        return T::default();
    }
    let last = sorted.len() - 1;
    let index = (p * last as f64).floor() as isize;
    let index = index.clamp(0, last as isize) as usize;
    sorted[index]
}

/// Subsample displacement magnitudes on a regular grid and compute
/// median/p90/max.
pub fn sample_magnitude(field: &FlowField) -> MagnitudeStats {
    if field.width == 0 || field.height == 0 {
        return MagnitudeStats::default();
    }
    let stride = (field.width / STAT_GRID).max(1);

    let mut magnitudes = Vec::new();
    let mut max = 0.0f32;
    let mut y = 0;
    while y < field.height {
        let mut x = 0;
        while x < field.width {
            let magnitude = field.magnitude_at(x, y);
            if magnitude > max {
                max = magnitude;
            }
            magnitudes.push(magnitude);
            x += stride;
        }
        y += stride;
    }

    if magnitudes.is_empty() {
        return MagnitudeStats::default();
    }
    magnitudes.sort_by(|a, b| a.total_cmp(b));

    MagnitudeStats {
        median: percentile(&magnitudes, 0.5),
        p90: percentile(&magnitudes, 0.9),
        max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_index_arithmetic() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.5), 3.0);
        // floor(0.9 * 4) = 3, so p90 is the fourth value, not the max.
        assert_eq!(percentile(&values, 0.9), 4.0);
    }

    #[test]
    fn percentile_extremes_hit_min_and_max() {
        let values = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 5.0);
    }

    #[test]
    fn empty_sample_yields_zero_for_any_p() {
        let empty: [f32; 0] = [];
        assert_eq!(percentile(&empty, 0.0), 0.0);
        assert_eq!(percentile(&empty, 0.5), 0.0);
        assert_eq!(percentile(&empty, 1.0), 0.0);
    }

    #[test]
    fn out_of_range_p_is_clamped() {
        let values = [1.0f32, 2.0, 3.0];
        assert_eq!(percentile(&values, -0.5), 1.0);
        assert_eq!(percentile(&values, 1.5), 3.0);
    }

    #[test]
    fn uniform_field_statistics() {
        let field = FlowField::new(64, 48, vec![3.0; 64 * 48], vec![4.0; 64 * 48]);
        let stats = sample_magnitude(&field);
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.p90, 5.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn stride_bounds_columns_visited() {
        // A single hot pixel off the sampling grid must not dominate p90.
        let width = 320;
        let height = 4;
        let mut dx = vec![0.0f32; width * height];
        dx[1] = 100.0; // stride is 10, so x=1 is never visited
        let field = FlowField::new(width, height, dx, vec![0.0; width * height]);
        let stats = sample_magnitude(&field);
        assert_eq!(stats.p90, 0.0);
        assert_eq!(stats.max, 0.0);
    }
}
