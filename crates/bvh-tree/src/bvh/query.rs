//! Ray and volume queries against a built [`Bvh`].

use std::fmt;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use log::trace;
use nalgebra::Point3;

use crate::{Aabb, Primitive, PrimitiveStore, Ray};

use super::node::BvhNode;
use super::tree::Bvh;

/// Predicate deciding whether a primitive takes part in a query.
pub type PrimitiveFilter<'f, T> = Box<dyn Fn(&Primitive<T>) -> bool + 'f>;

/// Counters gathered while answering a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Nodes whose bounds were tested, pruned ones included.
    pub nodes_visited: usize,
    /// Primitives tested against the ray or query volume.
    pub primitives_tested: usize,
    pub elapsed: Duration,
}

/// Options of [`Bvh::ray_intersection`].
pub struct RayQueryOptions<'f, T = ()> {
    /// Collect every hit. When `false` the query stops at the first hit
    /// found, which is not necessarily the closest one.
    pub find_all: bool,
    /// Only primitives accepted by the filter are tested.
    pub filter: Option<PrimitiveFilter<'f, T>>,
    /// Stop once this many hits were collected.
    pub max_intersections: Option<usize>,
    /// Sort the hits by ascending distance (stable) once traversal is done.
    pub sort_by_distance: bool,
}

impl<T> Default for RayQueryOptions<'_, T> {
    fn default() -> Self {
        Self {
            find_all: true,
            filter: None,
            max_intersections: None,
            sort_by_distance: true,
        }
    }
}

impl<'f, T> RayQueryOptions<'f, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that stop at the first hit found.
    pub fn first_hit() -> Self {
        Self {
            find_all: false,
            ..Self::default()
        }
    }

    pub fn with_find_all(mut self, find_all: bool) -> Self {
        self.find_all = find_all;
        self
    }

    pub fn with_filter(mut self, filter: impl Fn(&Primitive<T>) -> bool + 'f) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_max_intersections(mut self, max: usize) -> Self {
        self.max_intersections = Some(max);
        self
    }

    pub fn with_sort_by_distance(mut self, sort: bool) -> Self {
        self.sort_by_distance = sort;
        self
    }
}

impl<T> fmt::Debug for RayQueryOptions<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayQueryOptions")
            .field("find_all", &self.find_all)
            .field("filter", &self.filter.is_some())
            .field("max_intersections", &self.max_intersections)
            .field("sort_by_distance", &self.sort_by_distance)
            .finish()
    }
}

/// Options of [`Bvh::aabb_intersection`].
pub struct AabbQueryOptions<'f, T = ()> {
    /// Only primitives accepted by the filter are tested.
    pub filter: Option<PrimitiveFilter<'f, T>>,
    /// Stop once this many primitives were collected.
    pub max_intersections: Option<usize>,
}

impl<T> Default for AabbQueryOptions<'_, T> {
    fn default() -> Self {
        Self {
            filter: None,
            max_intersections: None,
        }
    }
}

impl<'f, T> AabbQueryOptions<'f, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Fn(&Primitive<T>) -> bool + 'f) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn with_max_intersections(mut self, max: usize) -> Self {
        self.max_intersections = Some(max);
        self
    }
}

impl<T> fmt::Debug for AabbQueryOptions<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AabbQueryOptions")
            .field("filter", &self.filter.is_some())
            .field("max_intersections", &self.max_intersections)
            .finish()
    }
}

/// A primitive hit by a ray.
#[derive(Debug)]
pub struct RayHit<'a, T = ()> {
    pub primitive: &'a Primitive<T>,
    /// Ray parameter of the hit. Exact for triangles, approximate for
    /// generic primitives.
    pub distance: f32,
}

impl<T> Clone for RayHit<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RayHit<'_, T> {}

/// Result of [`Bvh::ray_intersection`].
#[derive(Debug)]
pub struct RayQueryResult<'a, T = ()> {
    pub hits: Vec<RayHit<'a, T>>,
    pub stats: QueryStats,
}

impl<'a, T> RayQueryResult<'a, T> {
    fn empty() -> Self {
        Self {
            hits: Vec::new(),
            stats: QueryStats::default(),
        }
    }

    /// Number of hits.
    #[inline]
    pub fn count(&self) -> usize {
        self.hits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The hit primitives, in result order.
    pub fn primitives(&self) -> impl Iterator<Item = &'a Primitive<T>> + '_ {
        self.hits.iter().map(|hit| hit.primitive)
    }

    /// The hit distances, parallel to [`RayQueryResult::primitives`].
    pub fn distances(&self) -> impl Iterator<Item = f32> + '_ {
        self.hits.iter().map(|hit| hit.distance)
    }

    /// The hit with the smallest distance.
    pub fn closest(&self) -> Option<&RayHit<'a, T>> {
        self.hits
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Result of [`Bvh::aabb_intersection`] and [`Bvh::point_query`].
#[derive(Debug)]
pub struct AabbQueryResult<'a, T = ()> {
    pub primitives: Vec<&'a Primitive<T>>,
    pub stats: QueryStats,
}

impl<T> AabbQueryResult<'_, T> {
    fn empty() -> Self {
        Self {
            primitives: Vec::new(),
            stats: QueryStats::default(),
        }
    }

    /// Number of primitives found.
    #[inline]
    pub fn count(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

impl Bvh {
    /// Finds the primitives hit by `ray`.
    ///
    /// Subtrees whose bounds the ray misses are skipped without testing
    /// their primitives. `store` must be the store the tree was built from.
    pub fn ray_intersection<'a, T>(
        &self,
        store: &'a PrimitiveStore<T>,
        ray: &Ray,
        options: &RayQueryOptions<'_, T>,
    ) -> RayQueryResult<'a, T> {
        let start = Instant::now();
        let mut result = RayQueryResult::empty();

        if let Some(root) = self.root() {
            let mut query = RayQuery {
                store,
                ray,
                options,
                result: &mut result,
            };
            let _ = query.visit(root);
        }

        if options.sort_by_distance {
            result.hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        }
        result.stats.elapsed = start.elapsed();

        trace!(
            "ray query: {} hits, {} nodes visited, {} primitives tested",
            result.count(),
            result.stats.nodes_visited,
            result.stats.primitives_tested
        );
        result
    }

    /// The closest primitive hit by `ray`, if any.
    pub fn nearest_hit<'a, T>(
        &self,
        store: &'a PrimitiveStore<T>,
        ray: &Ray,
    ) -> Option<RayHit<'a, T>> {
        let options = RayQueryOptions::default().with_sort_by_distance(false);
        self.ray_intersection(store, ray, &options)
            .closest()
            .copied()
    }

    /// Finds the primitives whose bounds overlap `query` (inclusively).
    ///
    /// A primitive is reported on its own bounds, not on those of the leaf
    /// holding it. `store` must be the store the tree was built from.
    pub fn aabb_intersection<'a, T>(
        &self,
        store: &'a PrimitiveStore<T>,
        query: &Aabb,
        options: &AabbQueryOptions<'_, T>,
    ) -> AabbQueryResult<'a, T> {
        let start = Instant::now();
        let mut result = AabbQueryResult::empty();

        if let Some(root) = self.root() {
            let mut volume = VolumeQuery {
                store,
                query,
                options,
                result: &mut result,
            };
            let _ = volume.visit(root);
        }
        result.stats.elapsed = start.elapsed();

        trace!(
            "aabb query: {} found, {} nodes visited, {} primitives tested",
            result.count(),
            result.stats.nodes_visited,
            result.stats.primitives_tested
        );
        result
    }

    /// Finds the primitives whose bounds contain `point`.
    pub fn point_query<'a, T>(
        &self,
        store: &'a PrimitiveStore<T>,
        point: &Point3<f32>,
    ) -> AabbQueryResult<'a, T> {
        self.aabb_intersection(store, &Aabb::new(*point, *point), &AabbQueryOptions::default())
    }
}

struct RayQuery<'q, 'a, 'f, T> {
    store: &'a PrimitiveStore<T>,
    ray: &'q Ray,
    options: &'q RayQueryOptions<'f, T>,
    result: &'q mut RayQueryResult<'a, T>,
}

impl<T> RayQuery<'_, '_, '_, T> {
    fn is_full(&self) -> bool {
        self.options
            .max_intersections
            .is_some_and(|max| self.result.hits.len() >= max)
    }

    fn visit(&mut self, node: &BvhNode) -> ControlFlow<()> {
        if self.is_full() {
            return ControlFlow::Break(());
        }
        self.result.stats.nodes_visited += 1;
        if !node.bounds().ray_intersects(self.ray) {
            return ControlFlow::Continue(());
        }

        match node {
            BvhNode::Leaf { primitives, .. } => {
                for &index in primitives {
                    let Some(primitive) = self.store.get_index(index) else {
                        continue;
                    };
                    if let Some(filter) = &self.options.filter {
                        if !filter(primitive) {
                            continue;
                        }
                    }

                    self.result.stats.primitives_tested += 1;
                    if let Some(distance) = primitive.intersect_ray(self.ray) {
                        self.result.hits.push(RayHit {
                            primitive,
                            distance,
                        });

                        if !self.options.find_all || self.is_full() {
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            }
            BvhNode::Internal { left, right, .. } => {
                self.visit(left)?;
                self.visit(right)
            }
        }
    }
}

struct VolumeQuery<'q, 'a, 'f, T> {
    store: &'a PrimitiveStore<T>,
    query: &'q Aabb,
    options: &'q AabbQueryOptions<'f, T>,
    result: &'q mut AabbQueryResult<'a, T>,
}

impl<T> VolumeQuery<'_, '_, '_, T> {
    fn is_full(&self) -> bool {
        self.options
            .max_intersections
            .is_some_and(|max| self.result.primitives.len() >= max)
    }

    fn visit(&mut self, node: &BvhNode) -> ControlFlow<()> {
        if self.is_full() {
            return ControlFlow::Break(());
        }
        self.result.stats.nodes_visited += 1;
        if !node.bounds().overlaps(self.query) {
            return ControlFlow::Continue(());
        }

        match node {
            BvhNode::Leaf { primitives, .. } => {
                for &index in primitives {
                    let Some(primitive) = self.store.get_index(index) else {
                        continue;
                    };
                    if let Some(filter) = &self.options.filter {
                        if !filter(primitive) {
                            continue;
                        }
                    }

                    self.result.stats.primitives_tested += 1;
                    if primitive.bounds().overlaps(self.query) {
                        self.result.primitives.push(primitive);
                        if self.is_full() {
                            return ControlFlow::Break(());
                        }
                    }
                }
                ControlFlow::Continue(())
            }
            BvhNode::Internal { left, right, .. } => {
                self.visit(left)?;
                self.visit(right)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildConfig;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn cube(id: &str, center: [f32; 3]) -> Primitive<u32> {
        Primitive::new(
            id,
            Aabb::from_half_extents(Point3::from(center), Vector3::repeat(0.5)),
        )
    }

    /// Triangles in the plane z = i, each covering [0, 2] x [0, 2].
    fn stacked_triangles(n: usize) -> PrimitiveStore<u32> {
        (0..n)
            .map(|i| {
                let z = i as f32;
                Primitive::triangle(
                    format!("t{i}"),
                    Point3::new(0.0, 0.0, z),
                    Point3::new(2.0, 0.0, z),
                    Point3::new(0.0, 2.0, z),
                )
                .with_data(i as u32)
            })
            .collect()
    }

    fn build<T>(store: &PrimitiveStore<T>) -> Bvh {
        Bvh::build(store, &BuildConfig::default().with_max_primitives_per_leaf(2))
    }

    fn down_ray() -> Ray {
        Ray::new(Point3::new(0.5, 0.5, -1.0), Vector3::z())
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let store = PrimitiveStore::<u32>::new();
        let bvh = Bvh::new();
        let hits = bvh.ray_intersection(&store, &down_ray(), &RayQueryOptions::default());
        assert_eq!(hits.count(), 0);
        assert_eq!(hits.stats.nodes_visited, 0);

        let query = Aabb::new(Point3::new(-10.0, -10.0, -10.0), Point3::new(10.0, 10.0, 10.0));
        let found = bvh.aabb_intersection(&store, &query, &AabbQueryOptions::default());
        assert!(found.is_empty());
    }

    #[test]
    fn ray_hits_all_stacked_triangles_sorted() {
        let store = stacked_triangles(10);
        let bvh = build(&store);
        let result = bvh.ray_intersection(&store, &down_ray(), &RayQueryOptions::default());

        assert_eq!(result.count(), 10);
        let distances: Vec<f32> = result.distances().collect();
        for (i, d) in distances.iter().enumerate() {
            assert_relative_eq!(*d, i as f32 + 1.0, epsilon = 1e-5);
        }
        let data: Vec<u32> = result.primitives().map(|p| *p.data().unwrap()).collect();
        assert_eq!(data, (0..10).collect::<Vec<u32>>());
        assert_eq!(result.stats.primitives_tested, 10);
    }

    #[test]
    fn first_hit_stops_early() {
        let store = stacked_triangles(10);
        let bvh = build(&store);
        let result = bvh.ray_intersection(&store, &down_ray(), &RayQueryOptions::first_hit());
        assert_eq!(result.count(), 1);
        assert!(result.stats.primitives_tested < 10);
    }

    #[test]
    fn max_intersections_caps_hits() {
        let store = stacked_triangles(10);
        let bvh = build(&store);
        let options = RayQueryOptions::default().with_max_intersections(3);
        let result = bvh.ray_intersection(&store, &down_ray(), &options);
        assert_eq!(result.count(), 3);
    }

    #[test]
    fn zero_cap_finds_nothing() {
        let store = stacked_triangles(10);
        let bvh = build(&store);

        let options = RayQueryOptions::default().with_max_intersections(0);
        let result = bvh.ray_intersection(&store, &down_ray(), &options);
        assert_eq!(result.count(), 0);
        assert_eq!(result.stats.nodes_visited, 0);

        let everything = Aabb::new(Point3::new(-5.0, -5.0, -5.0), Point3::new(5.0, 5.0, 15.0));
        let capped = AabbQueryOptions::default().with_max_intersections(0);
        let found = bvh.aabb_intersection(&store, &everything, &capped);
        assert!(found.is_empty());
        assert_eq!(found.stats.primitives_tested, 0);
    }

    #[test]
    fn filter_skips_primitives() {
        let store = stacked_triangles(10);
        let bvh = build(&store);
        let options = RayQueryOptions::default()
            .with_filter(|p: &Primitive<u32>| p.data().is_some_and(|d| d % 2 == 0));
        let result = bvh.ray_intersection(&store, &down_ray(), &options);
        assert_eq!(result.count(), 5);
        assert!(result.primitives().all(|p| p.data().unwrap() % 2 == 0));
        assert_eq!(result.stats.primitives_tested, 5);
    }

    #[test]
    fn ray_range_limits_hits() {
        let store = stacked_triangles(10);
        let bvh = build(&store);
        let ray = down_ray().with_range(0.0, 4.5);
        let result = bvh.ray_intersection(&store, &ray, &RayQueryOptions::default());
        assert_eq!(result.count(), 4);
    }

    #[test]
    fn nearest_hit_is_closest() {
        let store = stacked_triangles(10);
        let bvh = build(&store);
        let ray = Ray::new(Point3::new(0.5, 0.5, 20.0), -Vector3::z());
        let hit = bvh.nearest_hit(&store, &ray).unwrap();
        assert_eq!(hit.primitive.id().as_str(), "t9");
        assert_relative_eq!(hit.distance, 11.0, epsilon = 1e-5);

        let miss = Ray::new(Point3::new(5.0, 5.0, -1.0), Vector3::z());
        assert!(bvh.nearest_hit(&store, &miss).is_none());
    }

    #[test]
    fn missed_subtrees_are_pruned() {
        let store: PrimitiveStore<u32> = (0..64)
            .map(|i| cube(&format!("c{i}"), [(i % 8) as f32 * 4.0, (i / 8) as f32 * 4.0, 0.0]))
            .collect();
        let bvh = build(&store);
        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::z());
        let result = bvh.ray_intersection(&store, &ray, &RayQueryOptions::default());

        assert_eq!(result.count(), 1);
        assert_eq!(result.hits[0].primitive.id().as_str(), "c0");
        assert!(result.stats.primitives_tested < 64);
        assert!(result.stats.nodes_visited < bvh.node_count());
    }

    #[test]
    fn aabb_query_uses_primitive_bounds() {
        let store: PrimitiveStore<u32> = [
            cube("a", [0.0, 0.0, 0.0]),
            cube("b", [3.0, 0.0, 0.0]),
            cube("c", [6.0, 0.0, 0.0]),
        ]
        .into_iter()
        .collect();
        // One leaf holds all three; the query only overlaps the first two.
        let bvh = Bvh::build(&store, &BuildConfig::default());
        let query = Aabb::new(Point3::new(0.0, -1.0, -1.0), Point3::new(3.0, 1.0, 1.0));
        let found = bvh.aabb_intersection(&store, &query, &AabbQueryOptions::default());

        let mut ids: Vec<&str> = found.primitives.iter().map(|p| p.id().as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(found.stats.primitives_tested, 3);
    }

    #[test]
    fn aabb_query_filter_and_cap() {
        let store: PrimitiveStore<u32> = (0..20)
            .map(|i| cube(&format!("c{i}"), [i as f32, 0.0, 0.0]).with_data(i))
            .collect();
        let bvh = build(&store);
        let query = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(30.0, 1.0, 1.0));

        let odd = AabbQueryOptions::default()
            .with_filter(|p: &Primitive<u32>| p.data().is_some_and(|d| d % 2 == 1));
        assert_eq!(bvh.aabb_intersection(&store, &query, &odd).count(), 10);

        let capped = AabbQueryOptions::default().with_max_intersections(7);
        assert_eq!(bvh.aabb_intersection(&store, &query, &capped).count(), 7);
    }

    #[test]
    fn point_query_finds_containing_boxes() {
        let store: PrimitiveStore<u32> = [
            cube("a", [0.0, 0.0, 0.0]),
            cube("b", [0.4, 0.0, 0.0]),
            cube("c", [5.0, 0.0, 0.0]),
        ]
        .into_iter()
        .collect();
        let bvh = build(&store);
        let found = bvh.point_query(&store, &Point3::new(0.2, 0.0, 0.0));
        assert_eq!(found.count(), 2);
    }
}
