//! BVH (Bounding Volume Hierarchy) for ray and volume queries.
//!
//! Primitives (triangles or arbitrary bounded shapes) are kept in a
//! [`BvhIndex`], which rebuilds a binary [`Bvh`] over them on every mutation
//! and answers ray and axis-aligned volume queries against it.

mod aabb;
pub mod bvh;
mod config;
mod error;
mod index;
mod observer;
mod primitive;
mod ray;
mod store;
mod triangle;

pub use aabb::Aabb;
pub use bvh::{
    AabbQueryOptions, AabbQueryResult, Bvh, BvhNode, NodeId, QueryStats, RayHit,
    RayQueryOptions, RayQueryResult,
};
pub use config::{BuildConfig, MAX_SAH_BINS};
pub use error::{BvhError, ConfigError};
pub use index::{BatchReport, BvhIndex, InsertOutcome};
pub use observer::{CollectingObserver, FnObserver, IndexEvent, IndexObserver, NoopObserver};
pub use primitive::{Geometry, Primitive, PrimitiveId};
pub use ray::Ray;
pub use store::PrimitiveStore;
pub use triangle::{Triangle, INTERSECTION_EPSILON};
