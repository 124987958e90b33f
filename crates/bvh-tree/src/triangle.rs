//! Triangle geometry and exact ray/triangle intersection.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, Ray};

/// Tolerance of the ray/triangle test.
///
/// Rays whose determinant falls below it are treated as parallel to the
/// triangle, and hits at or below it along the ray are treated as behind
/// the origin.
pub const INTERSECTION_EPSILON: f32 = 1e-6;

/// A triangle in 3D space, defined by three vertices.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    vertices: [Point3<f32>; 3],
}

impl Triangle {
    /// Creates a new triangle from three points.
    ///
    /// The winding order determines the normal direction via the right-hand rule:
    /// normal = (b - a) × (c - a)
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Returns the three vertices of the triangle.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>; 3] {
        &self.vertices
    }

    /// Computes the (unnormalized) normal vector of the triangle.
    pub fn normal(&self) -> Vector3<f32> {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Computes the unit normal vector of the triangle.
    ///
    /// Returns `None` if the triangle is degenerate (zero area).
    pub fn unit_normal(&self) -> Option<Vector3<f32>> {
        let n = self.normal();
        let len = n.norm();
        if len > f32::EPSILON {
            Some(n / len)
        } else {
            None
        }
    }

    /// Computes the centroid (center of mass) of the triangle.
    pub fn centroid(&self) -> Point3<f32> {
        let [a, b, c] = &self.vertices;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Smallest box enclosing the three vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices)
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// Returns the ray parameter `t` of the hit, or `None` when the ray is
    /// (nearly) parallel to the triangle, passes outside it, hits it at or
    /// behind the origin, or hits it outside `[ray.t_min, ray.t_max]`.
    /// Both faces are hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let [v0, v1, v2] = &self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let p = ray.direction.cross(&edge2);
        let det = edge1.dot(&p);
        if det.abs() < INTERSECTION_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = ray.origin - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = ray.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(&q) * inv_det;
        if t > INTERSECTION_EPSILON && ray.contains_t(t) {
            Some(t)
        } else {
            None
        }
    }
}
