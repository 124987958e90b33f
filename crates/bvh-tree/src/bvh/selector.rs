//! Split selection strategies for BVH construction.
//!
//! A split divides the primitives of a node into a left and a right group.
//! The quality of the splits decides how many nodes a query visits; the
//! cost of finding them decides how long a rebuild takes.

use nalgebra::Point3;

use crate::{Aabb, BuildConfig, MAX_SAH_BINS};

/// A primitive as seen by the builder: its store position, bounds and the
/// center of its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildEntry {
    pub index: usize,
    pub bounds: Aabb,
    pub center: Point3<f32>,
}

impl BuildEntry {
    pub fn new(index: usize, bounds: Aabb) -> Self {
        Self {
            index,
            bounds,
            center: bounds.center(),
        }
    }
}

/// A chosen split: `entries[..mid]` go left, `entries[mid..]` go right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// Axis the split was made along (0 = x, 1 = y, 2 = z).
    pub axis: usize,
    pub mid: usize,
    /// Estimated cost of the split, when the strategy has a cost model.
    pub cost: Option<f32>,
}

/// Strategy for dividing a node's primitives in two.
pub trait SplitSelector {
    /// Reorders `entries` so the left group comes first and returns where
    /// the right group starts.
    ///
    /// Returns `None` when the strategy finds no split leaving both sides
    /// non-empty; the order of `entries` is then unspecified.
    fn select(&self, entries: &mut [BuildEntry], bounds: &Aabb, config: &BuildConfig)
        -> Option<Split>;
}

/// Binned surface area heuristic.
///
/// On each axis, `sah_bins - 1` split positions are spread evenly over the
/// node's extent. A primitive goes left of a position when its center is
/// strictly below it. The position with the smallest cost
/// `traversal + (SA_l / SA) * n_l * isect + (SA_r / SA) * n_r * isect`
/// over all three axes wins; the first one found wins ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceAreaHeuristic;

#[derive(Debug, Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb::invalid(),
            count: 0,
        }
    }
}

impl SplitSelector for SurfaceAreaHeuristic {
    fn select(
        &self,
        entries: &mut [BuildEntry],
        bounds: &Aabb,
        config: &BuildConfig,
    ) -> Option<Split> {
        let num_bins = config.sah_bins.min(MAX_SAH_BINS);
        if entries.len() < 2 || num_bins < 2 {
            return None;
        }

        let parent_area = bounds.surface_area();
        let parent_area = if parent_area > 0.0 { parent_area } else { 1.0 };

        let mut best: Option<(f32, usize, f32)> = None;
        let mut positions = Vec::with_capacity(num_bins - 1);
        let mut bins = vec![Bin::default(); num_bins];

        for axis in 0..3 {
            let lo = bounds.min[axis];
            let extent = bounds.max[axis] - lo;
            if !(extent > 0.0) {
                continue;
            }

            positions.clear();
            positions.extend((1..num_bins).map(|k| lo + extent * k as f32 / num_bins as f32));

            // Bin `j` holds the entries lying right of exactly `j` positions,
            // so position `k` splits bins `..k` from bins `k..`.
            bins.fill(Bin::default());
            for entry in entries.iter() {
                let c = entry.center[axis];
                let bin = &mut bins[positions.partition_point(|&p| p <= c)];
                bin.bounds.merge(&entry.bounds);
                bin.count += 1;
            }

            let mut right_acc = vec![Bin::default(); num_bins + 1];
            for j in (0..num_bins).rev() {
                right_acc[j] = Bin {
                    bounds: right_acc[j + 1].bounds.merged(&bins[j].bounds),
                    count: right_acc[j + 1].count + bins[j].count,
                };
            }

            let mut left = Bin::default();
            for k in 1..num_bins {
                left.bounds.merge(&bins[k - 1].bounds);
                left.count += bins[k - 1].count;
                let right = &right_acc[k];

                if left.count == 0 || right.count == 0 {
                    continue;
                }

                let cost = config.traversal_cost
                    + left.bounds.surface_area() / parent_area
                        * left.count as f32
                        * config.intersection_cost
                    + right.bounds.surface_area() / parent_area
                        * right.count as f32
                        * config.intersection_cost;

                if best.is_none_or(|(best_cost, _, _)| cost < best_cost) {
                    best = Some((cost, axis, positions[k - 1]));
                }
            }
        }

        let (cost, axis, position) = best?;

        // Stable: false (left) sorts before true (right).
        entries.sort_by_key(|e| !(e.center[axis] < position));
        let mid = entries.partition_point(|e| e.center[axis] < position);

        if mid == 0 || mid == entries.len() {
            return None;
        }

        Some(Split {
            axis,
            mid,
            cost: Some(cost),
        })
    }
}

/// Sorts the primitives by center along the node's longest axis and cuts
/// the list in half.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestAxisMedian;

impl SplitSelector for LongestAxisMedian {
    fn select(
        &self,
        entries: &mut [BuildEntry],
        bounds: &Aabb,
        _config: &BuildConfig,
    ) -> Option<Split> {
        if entries.len() < 2 {
            return None;
        }

        let axis = bounds.longest_axis();
        entries.sort_by(|a, b| a.center[axis].total_cmp(&b.center[axis]));

        Some(Split {
            axis,
            mid: entries.len() / 2,
            cost: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn entry(index: usize, center: [f32; 3]) -> BuildEntry {
        BuildEntry::new(
            index,
            Aabb::from_half_extents(Point3::from(center), Vector3::repeat(0.25)),
        )
    }

    fn enclosing(entries: &[BuildEntry]) -> Aabb {
        entries
            .iter()
            .fold(Aabb::invalid(), |acc, e| acc.merged(&e.bounds))
    }

    fn indices(entries: &[BuildEntry]) -> Vec<usize> {
        let mut v: Vec<usize> = entries.iter().map(|e| e.index).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn sah_caps_oversized_bin_counts() {
        let mut entries: Vec<BuildEntry> = (0..8)
            .map(|i| entry(i, [i as f32 * 2.0, 0.0, 0.0]))
            .collect();
        let bounds = enclosing(&entries);
        let config = BuildConfig {
            sah_bins: usize::MAX / 4,
            ..BuildConfig::default()
        };
        let split = SurfaceAreaHeuristic
            .select(&mut entries, &bounds, &config)
            .unwrap();
        assert!(split.mid > 0 && split.mid < 8);
    }

    #[test]
    fn sah_separates_two_clusters() {
        let mut entries = vec![
            entry(0, [0.0, 0.0, 0.0]),
            entry(1, [10.0, 0.0, 0.0]),
            entry(2, [0.5, 0.0, 0.0]),
            entry(3, [10.5, 0.0, 0.0]),
        ];
        let bounds = enclosing(&entries);
        let split = SurfaceAreaHeuristic
            .select(&mut entries, &bounds, &BuildConfig::default())
            .unwrap();

        assert_eq!(split.axis, 0);
        assert_eq!(split.mid, 2);
        assert!(split.cost.is_some());
        assert_eq!(indices(&entries[..2]), [0, 2]);
        assert_eq!(indices(&entries[2..]), [1, 3]);
    }

    #[test]
    fn sah_picks_axis_with_spread() {
        let mut entries = vec![
            entry(0, [0.0, 0.0, 0.0]),
            entry(1, [0.0, 0.0, 8.0]),
            entry(2, [0.0, 0.1, 0.5]),
            entry(3, [0.0, 0.1, 8.5]),
        ];
        let bounds = enclosing(&entries);
        let split = SurfaceAreaHeuristic
            .select(&mut entries, &bounds, &BuildConfig::default())
            .unwrap();
        assert_eq!(split.axis, 2);
        assert_eq!(indices(&entries[..split.mid]), [0, 2]);
    }

    #[test]
    fn sah_gives_up_on_identical_centers() {
        let mut entries = vec![
            BuildEntry::new(0, Aabb::new(Point3::origin(), Point3::new(2.0, 2.0, 2.0))),
            BuildEntry::new(1, Aabb::new(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5))),
            BuildEntry::new(2, Aabb::new(Point3::new(0.9, 0.9, 0.9), Point3::new(1.1, 1.1, 1.1))),
        ];
        let bounds = enclosing(&entries);
        assert!(SurfaceAreaHeuristic
            .select(&mut entries, &bounds, &BuildConfig::default())
            .is_none());
    }

    #[test]
    fn sah_partition_matches_center_test() {
        let mut entries: Vec<BuildEntry> = (0..20)
            .map(|i| entry(i, [(i * 7 % 13) as f32, (i % 5) as f32, 0.0]))
            .collect();
        let bounds = enclosing(&entries);
        let config = BuildConfig::default().with_sah_bins(5);
        let split = SurfaceAreaHeuristic.select(&mut entries, &bounds, &config).unwrap();

        let (left, right) = entries.split_at(split.mid);
        let max_left = left
            .iter()
            .map(|e| e.center[split.axis])
            .fold(f32::NEG_INFINITY, f32::max);
        let min_right = right
            .iter()
            .map(|e| e.center[split.axis])
            .fold(f32::INFINITY, f32::min);
        assert!(max_left < min_right);
    }

    #[test]
    fn median_halves_along_longest_axis() {
        let mut entries = vec![
            entry(0, [0.0, 3.0, 0.0]),
            entry(1, [0.0, 1.0, 0.0]),
            entry(2, [0.0, 4.0, 0.0]),
            entry(3, [0.0, 2.0, 0.0]),
            entry(4, [0.0, 0.0, 0.0]),
        ];
        let bounds = enclosing(&entries);
        let split = LongestAxisMedian
            .select(&mut entries, &bounds, &BuildConfig::default())
            .unwrap();

        assert_eq!(split.axis, 1);
        assert_eq!(split.mid, 2);
        assert!(split.cost.is_none());
        assert_eq!(indices(&entries[..2]), [1, 4]);
        assert_eq!(indices(&entries[2..]), [0, 2, 3]);
    }

    #[test]
    fn median_splits_identical_centers() {
        let mut entries: Vec<BuildEntry> = (0..4).map(|i| entry(i, [1.0, 1.0, 1.0])).collect();
        let bounds = enclosing(&entries);
        let split = LongestAxisMedian
            .select(&mut entries, &bounds, &BuildConfig::default())
            .unwrap();
        assert_eq!(split.mid, 2);
    }

    #[test]
    fn single_entry_cannot_split() {
        let mut entries = vec![entry(0, [0.0, 0.0, 0.0])];
        let bounds = enclosing(&entries);
        let config = BuildConfig::default();
        assert!(SurfaceAreaHeuristic.select(&mut entries, &bounds, &config).is_none());
        assert!(LongestAxisMedian.select(&mut entries, &bounds, &config).is_none());
    }
}
