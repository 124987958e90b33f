//! Rays used by the ray query.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A half-line `origin + t * direction`, restricted to `t_min <= t <= t_max`.
///
/// The direction does not need to be normalized; distances reported by the
/// ray query are expressed in multiples of `direction`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    /// Creates a ray covering `[0, +inf)`.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction,
            t_min: 0.0,
            t_max: f32::INFINITY,
        }
    }

    /// Returns a copy of this ray restricted to `[t_min, t_max]`.
    pub fn with_range(mut self, t_min: f32, t_max: f32) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }

    /// The point at parameter `t` along the ray.
    #[inline]
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Returns `true` if `t` lies within the ray's range.
    #[inline]
    pub fn contains_t(&self, t: f32) -> bool {
        t >= self.t_min && t <= self.t_max
    }
}
