//! Tree construction parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Largest accepted [`BuildConfig::sah_bins`].
pub const MAX_SAH_BINS: usize = 256;

/// Parameters of a BVH build.
///
/// A configuration is fixed for the duration of a build. The cost model of
/// the surface area heuristic is
/// `traversal_cost + (SA_left / SA_parent) * n_left * intersection_cost
///  + (SA_right / SA_parent) * n_right * intersection_cost`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildConfig {
    /// A node holding at most this many primitives becomes a leaf.
    pub max_primitives_per_leaf: usize,
    /// Nodes at this depth become leaves regardless of their size. The root
    /// is at depth 0.
    pub max_depth: usize,
    /// Use the surface area heuristic. When `false`, every split is a median
    /// split along the longest axis.
    pub use_cost_heuristic: bool,
    /// Number of bins per axis; `sah_bins - 1` split positions are evaluated.
    pub sah_bins: usize,
    /// Cost of visiting an internal node.
    pub traversal_cost: f32,
    /// Cost of testing one primitive.
    pub intersection_cost: f32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_primitives_per_leaf: 4,
            max_depth: 32,
            use_cost_heuristic: true,
            sah_bins: 12,
            traversal_cost: 1.0,
            intersection_cost: 1.0,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_primitives_per_leaf(mut self, max: usize) -> Self {
        self.max_primitives_per_leaf = max;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cost_heuristic(mut self, enabled: bool) -> Self {
        self.use_cost_heuristic = enabled;
        self
    }

    pub fn with_sah_bins(mut self, bins: usize) -> Self {
        self.sah_bins = bins;
        self
    }

    pub fn with_costs(mut self, traversal_cost: f32, intersection_cost: f32) -> Self {
        self.traversal_cost = traversal_cost;
        self.intersection_cost = intersection_cost;
        self
    }

    /// Checks that the configuration can drive a build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_primitives_per_leaf == 0 {
            return Err(ConfigError::ZeroLeafSize);
        }
        if self.sah_bins < 2 {
            return Err(ConfigError::TooFewBins(self.sah_bins));
        }
        if self.sah_bins > MAX_SAH_BINS {
            return Err(ConfigError::TooManyBins(self.sah_bins));
        }
        let cost_ok = |c: f32| c.is_finite() && c >= 0.0;
        if !cost_ok(self.traversal_cost) || !cost_ok(self.intersection_cost) {
            return Err(ConfigError::InvalidCost);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(BuildConfig::default().validate(), Ok(()));
    }

    #[test]
    fn builder_methods_set_fields() {
        let config = BuildConfig::new()
            .with_max_primitives_per_leaf(2)
            .with_max_depth(8)
            .with_cost_heuristic(false)
            .with_sah_bins(16)
            .with_costs(0.5, 2.0);
        assert_eq!(config.max_primitives_per_leaf, 2);
        assert_eq!(config.max_depth, 8);
        assert!(!config.use_cost_heuristic);
        assert_eq!(config.sah_bins, 16);
        assert_eq!(config.traversal_cost, 0.5);
        assert_eq!(config.intersection_cost, 2.0);
    }

    #[test]
    fn rejects_unusable_values() {
        let zero_leaf = BuildConfig::new().with_max_primitives_per_leaf(0);
        assert_eq!(zero_leaf.validate(), Err(ConfigError::ZeroLeafSize));

        let one_bin = BuildConfig::new().with_sah_bins(1);
        assert_eq!(one_bin.validate(), Err(ConfigError::TooFewBins(1)));

        let huge = BuildConfig::new().with_sah_bins(usize::MAX / 4);
        assert_eq!(huge.validate(), Err(ConfigError::TooManyBins(usize::MAX / 4)));
        assert_eq!(BuildConfig::new().with_sah_bins(MAX_SAH_BINS).validate(), Ok(()));

        let negative = BuildConfig::new().with_costs(-1.0, 1.0);
        assert_eq!(negative.validate(), Err(ConfigError::InvalidCost));

        let nan = BuildConfig::new().with_costs(1.0, f32::NAN);
        assert_eq!(nan.validate(), Err(ConfigError::InvalidCost));
    }
}
