//! Primitives stored in the BVH.

use std::fmt;

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, Ray, Triangle};

/// Caller-assigned identifier of a primitive.
///
/// Identifiers are compared by value; inserting a primitive whose id is
/// already stored replaces the old one. The empty identifier is rejected on
/// insertion.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(String);

impl PrimitiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrimitiveId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PrimitiveId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for PrimitiveId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PrimitiveId {
                fn from(id: $t) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

impl_from_integer!(u32, u64, usize, i32, i64);

impl std::borrow::Borrow<str> for PrimitiveId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The shape behind a primitive's bounds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// An arbitrary shape known only through its bounding box. Ray hits
    /// against it are approximate.
    Bounds,
    /// A triangle, intersected exactly.
    Triangle(Triangle),
}

/// A bounded primitive with an optional user payload.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive<T = ()> {
    id: PrimitiveId,
    bounds: Aabb,
    geometry: Geometry,
    data: Option<T>,
}

impl<T> Primitive<T> {
    /// Creates a generic primitive from its bounding box.
    pub fn new(id: impl Into<PrimitiveId>, bounds: Aabb) -> Self {
        Self {
            id: id.into(),
            bounds,
            geometry: Geometry::Bounds,
            data: None,
        }
    }

    /// Creates a triangle primitive. Its bounds enclose the three vertices.
    pub fn triangle(
        id: impl Into<PrimitiveId>,
        a: Point3<f32>,
        b: Point3<f32>,
        c: Point3<f32>,
    ) -> Self {
        Self::from_triangle(id, Triangle::new(a, b, c))
    }

    /// Wraps an existing [`Triangle`].
    pub fn from_triangle(id: impl Into<PrimitiveId>, triangle: Triangle) -> Self {
        Self {
            id: id.into(),
            bounds: triangle.bounds(),
            geometry: Geometry::Triangle(triangle),
            data: None,
        }
    }

    /// Attaches a payload.
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    #[inline]
    pub fn id(&self) -> &PrimitiveId {
        &self.id
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    #[inline]
    pub fn data_mut(&mut self) -> Option<&mut T> {
        self.data.as_mut()
    }

    /// Returns `true` for triangle primitives.
    #[inline]
    pub fn is_triangle(&self) -> bool {
        matches!(self.geometry, Geometry::Triangle(_))
    }

    /// Replaces the bounds of a generic primitive.
    ///
    /// Triangle bounds always follow their vertices, so for triangles this
    /// replaces the geometry with [`Geometry::Bounds`].
    pub fn set_bounds(&mut self, bounds: Aabb) {
        self.bounds = bounds;
        self.geometry = Geometry::Bounds;
    }

    /// Replaces the triangle, recomputing the bounds.
    pub fn set_triangle(&mut self, triangle: Triangle) {
        self.bounds = triangle.bounds();
        self.geometry = Geometry::Triangle(triangle);
    }

    /// Distance along `ray` at which it hits this primitive.
    ///
    /// Triangles are intersected exactly. Generic primitives only know their
    /// bounds: if the ray hits the bounds, the reported distance is the
    /// distance from the ray origin to the bounds center, measured in units
    /// of the ray direction. That approximation must itself lie within the
    /// ray's range for the primitive to count as hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        match &self.geometry {
            Geometry::Triangle(triangle) => triangle.intersect_ray(ray),
            Geometry::Bounds => {
                if !self.bounds.ray_intersects(ray) {
                    return None;
                }
                let dir_len = ray.direction.norm();
                if dir_len <= f32::EPSILON {
                    return None;
                }
                let distance = (self.bounds.center() - ray.origin).norm() / dir_len;
                ray.contains_t(distance).then_some(distance)
            }
        }
    }
}
