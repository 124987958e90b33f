//! Axis-aligned bounding boxes and the box tests used for pruning.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Ray;

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
///
/// A valid box satisfies `min[i] <= max[i]` on every axis. The center and
/// size are always derived from the corners and never stored separately.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Corner with the smallest coordinate on each axis.
    pub min: Point3<f32>,
    /// Corner with the largest coordinate on each axis.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Creates a box from its two corners.
    ///
    /// No reordering is performed: `min` must not exceed `max` on any axis
    /// for the box to be valid (see [`Aabb::is_valid`]).
    #[inline]
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Returns the empty box: `min` at +inf and `max` at -inf.
    ///
    /// Merging anything into it yields that thing, which makes it the
    /// starting value for accumulating unions.
    #[inline]
    pub fn invalid() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Creates a cube-shaped box centered on `center`.
    pub fn from_half_extents(center: Point3<f32>, half_extents: Vector3<f32>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box enclosing every point. Returns [`Aabb::invalid`] when
    /// the iterator is empty.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        points.into_iter().fold(Self::invalid(), |mut aabb, p| {
            aabb.take_point(p);
            aabb
        })
    }

    /// Returns the union of two boxes.
    #[inline]
    pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
        a.merged(b)
    }

    /// Returns a box enclosing both `self` and `other`.
    #[inline]
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grows `self` to enclose `other`.
    #[inline]
    pub fn merge(&mut self, other: &Aabb) {
        *self = self.merged(other);
    }

    /// Grows `self` to enclose `point`.
    #[inline]
    pub fn take_point(&mut self, point: Point3<f32>) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// The point halfway between the two corners.
    #[inline]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent of the box along each axis.
    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Returns `true` if `min <= max` on every axis.
    ///
    /// NaN coordinates make a box invalid.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    /// Returns `true` if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|c| c.is_finite())
    }

    /// Surface area: `2 * (w*h + h*d + d*w)`.
    pub fn surface_area(&self) -> f32 {
        let s = self.size();
        2.0 * (s.x * s.y + s.y * s.z + s.z * s.x)
    }

    /// Volume of the box.
    pub fn volume(&self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Index of the axis with the largest extent (0 = x, 1 = y, 2 = z).
    ///
    /// Ties resolve to the lowest axis index.
    pub fn longest_axis(&self) -> usize {
        let s = self.size();
        let mut axis = 0;
        for i in 1..3 {
            if s[i] > s[axis] {
                axis = i;
            }
        }
        axis
    }

    /// Inclusive interval overlap on all three axes.
    ///
    /// Boxes that merely touch on a face, edge or corner overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    /// Returns `true` if `point` lies inside the box or on its boundary.
    #[inline]
    pub fn contains_point(&self, point: &Point3<f32>) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }

    /// Returns `true` if `other` lies entirely within `self`.
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Slab test against `ray`, clipped to `[ray.t_min, ray.t_max]`.
    ///
    /// Only answers whether the ray hits; the hit distance of the primitive
    /// inside is computed separately. A zero direction component divides by
    /// zero and relies on IEEE infinities: an origin strictly inside or
    /// outside that slab is handled, an origin exactly on a slab plane is not.
    pub fn ray_intersects(&self, ray: &Ray) -> bool {
        let mut t_near = ray.t_min;
        let mut t_far = ray.t_max;

        for i in 0..3 {
            let inv_dir = 1.0 / ray.direction[i];
            let mut t0 = (self.min[i] - ray.origin[i]) * inv_dir;
            let mut t1 = (self.max[i] - ray.origin[i]) * inv_dir;

            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            t_near = t_near.max(t0);
            t_far = t_far.min(t1);

            if t_near > t_far {
                return false;
            }
        }

        true
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn aabb(min: [f32; 3], max: [f32; 3]) -> Aabb {
        Aabb::new(Point3::from(min), Point3::from(max))
    }

    #[test]
    fn derived_center_and_size() {
        let b = aabb([0.0, 2.0, -4.0], [2.0, 6.0, 4.0]);
        assert_eq!(b.center(), Point3::new(1.0, 4.0, 0.0));
        assert_eq!(b.size(), Vector3::new(2.0, 4.0, 8.0));
    }

    #[test]
    fn union_encloses_both() {
        let a = aabb([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = aabb([-1.0, 0.5, 2.0], [0.5, 3.0, 4.0]);
        let u = Aabb::union(&a, &b);
        assert_eq!(u, aabb([-1.0, 0.0, 0.0], [1.0, 3.0, 4.0]));
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn invalid_is_merge_identity() {
        let a = aabb([0.0, 1.0, 2.0], [3.0, 4.0, 5.0]);
        assert!(!Aabb::invalid().is_valid());
        assert_eq!(Aabb::invalid().merged(&a), a);
    }

    #[test]
    fn from_points_encloses_points() {
        let b = Aabb::from_points([
            Point3::new(1.0, 0.0, 3.0),
            Point3::new(-1.0, 4.0, 2.0),
            Point3::new(0.0, 2.0, 5.0),
        ]);
        assert_eq!(b, aabb([-1.0, 0.0, 2.0], [1.0, 4.0, 5.0]));
    }

    #[test]
    fn surface_area_of_box() {
        let b = aabb([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        // 2 * (1*2 + 2*3 + 3*1) = 22
        assert_relative_eq!(b.surface_area(), 22.0);
        assert_relative_eq!(b.volume(), 6.0);
    }

    #[test]
    fn flat_box_has_surface_area() {
        let b = aabb([0.0, 0.0, 0.0], [2.0, 2.0, 0.0]);
        assert_relative_eq!(b.surface_area(), 8.0);
    }

    #[test]
    fn overlap_is_inclusive() {
        let a = aabb([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let touching = aabb([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let apart = aabb([1.01, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
    }

    #[test]
    fn longest_axis_picks_largest_extent() {
        assert_eq!(aabb([0.0, 0.0, 0.0], [1.0, 5.0, 2.0]).longest_axis(), 1);
        assert_eq!(aabb([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]).longest_axis(), 0);
    }

    #[test]
    fn ray_hits_box_in_front() {
        let b = aabb([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.1, 0.1, 1.0));
        assert!(b.ray_intersects(&ray));
    }

    #[test]
    fn ray_misses_box_behind_origin() {
        let b = aabb([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let ray = Ray::new(Point3::new(0.1, 0.1, 5.0), Vector3::new(0.0001, 0.0001, 1.0));
        assert!(!b.ray_intersects(&ray));
    }

    #[test]
    fn ray_range_is_respected() {
        let b = aabb([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let ray = Ray::new(Point3::new(0.2, 0.3, -5.0), Vector3::new(0.0001, 0.0001, 1.0))
            .with_range(0.0, 3.0);
        assert!(!b.ray_intersects(&ray));
        assert!(b.ray_intersects(&ray.with_range(0.0, 4.5)));
    }

    #[test]
    fn axis_parallel_ray_uses_infinities() {
        let b = aabb([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let inside = Ray::new(Point3::new(0.5, 0.5, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let outside = Ray::new(Point3::new(2.0, 0.5, -5.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(b.ray_intersects(&inside));
        assert!(!b.ray_intersects(&outside));
    }

    #[test]
    fn ray_starting_inside_hits() {
        let b = aabb([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let ray = Ray::new(Point3::origin(), Vector3::new(1.0, 0.3, 0.2));
        assert!(b.ray_intersects(&ray));
    }
}
