//! Bounding Volume Hierarchy over bounded primitives.
//!
//! This module provides a binary BVH that recursively partitions a set of
//! primitives into groups with tight bounding boxes. The tree enables:
//!
//! - Ray queries that skip every subtree whose bounds the ray misses
//! - Volume queries that skip every subtree whose bounds miss the volume
//!
//! # Example
//!
//! ```ignore
//! use bvh_tree::{Bvh, BuildConfig, PrimitiveStore, Primitive, Ray, RayQueryOptions};
//! use nalgebra::{Point3, Vector3};
//!
//! let store: PrimitiveStore = [Primitive::triangle(
//!     "floor",
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(0.0, 2.0, 0.0),
//! )]
//! .into_iter()
//! .collect();
//!
//! let bvh = Bvh::build(&store, &BuildConfig::default());
//! let ray = Ray::new(Point3::new(0.5, 0.5, -1.0), Vector3::z());
//! let hits = bvh.ray_intersection(&store, &ray, &RayQueryOptions::default());
//! assert_eq!(hits.count(), 1);
//! ```
//!
//! # Architecture
//!
//! - [`Bvh`]: The tree container holding the root node
//! - [`BvhNode`]: Leaves holding primitives and internal nodes holding two children
//! - [`SplitSelector`]: Strategy trait for dividing a node's primitives
//! - [`RayQueryOptions`] / [`AabbQueryOptions`]: Query parameters

mod node;
mod query;
mod selector;
mod tree;

pub use node::{BvhNode, NodeId, PreOrder};
pub use query::{
    AabbQueryOptions, AabbQueryResult, PrimitiveFilter, QueryStats, RayHit, RayQueryOptions,
    RayQueryResult,
};
pub use selector::{BuildEntry, LongestAxisMedian, Split, SplitSelector, SurfaceAreaHeuristic};
pub use tree::Bvh;
