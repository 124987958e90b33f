//! Errors reported by index mutations and configuration checks.

use crate::PrimitiveId;

/// Reasons a [`BuildConfig`](crate::BuildConfig) is rejected.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Leaves must be able to hold at least one primitive.
    #[error("max_primitives_per_leaf must be at least 1")]
    ZeroLeafSize,
    /// At least two bins are needed to get one candidate split position.
    #[error("sah_bins must be at least 2, got {0}")]
    TooFewBins(usize),
    /// Bins are allocated per split, so their number is capped.
    #[error("sah_bins must be at most {max}, got {0}", max = crate::MAX_SAH_BINS)]
    TooManyBins(usize),
    /// Traversal and intersection costs must be finite and non-negative.
    #[error("traversal and intersection costs must be finite and non-negative")]
    InvalidCost,
}

/// A mutation of the index that was rejected.
///
/// Queries never fail; an empty index just yields an empty result.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum BvhError {
    /// The primitive has an empty identifier.
    #[error("primitive identifier must not be empty")]
    InvalidId,
    /// The primitive's bounds have `min > max` on some axis.
    #[error("primitive {id} has min {min} > max {max} on axis {axis}")]
    InvalidBounds {
        id: PrimitiveId,
        axis: usize,
        min: f32,
        max: f32,
    },
    /// The primitive's bounds contain NaN or infinite coordinates.
    #[error("primitive {id} has non-finite bounds")]
    NonFiniteBounds { id: PrimitiveId },
    /// No primitive with this identifier is stored.
    #[error("no primitive with id {0}")]
    NotFound(PrimitiveId),
    /// The build configuration is unusable.
    #[error("invalid build configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
