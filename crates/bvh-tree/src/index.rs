//! The maintained index: a primitive store plus the BVH built over it.

use log::warn;
use nalgebra::Point3;

use crate::{
    Aabb, AabbQueryOptions, AabbQueryResult, BuildConfig, Bvh, BvhError, Geometry, IndexEvent,
    IndexObserver, NoopObserver, Primitive, PrimitiveId, PrimitiveStore, Ray, RayHit,
    RayQueryOptions, RayQueryResult,
};

/// Whether an insertion added a new primitive or replaced a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A primitive with the same id was stored and has been overwritten.
    Replaced,
}

/// Outcome of [`BvhIndex::insert_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Primitives stored as new entries.
    pub inserted: usize,
    /// Primitives that overwrote an entry with the same id.
    pub replaced: usize,
    /// Primitives refused by validation, with the reason.
    pub rejected: Vec<BvhError>,
}

impl BatchReport {
    /// Returns `true` if every primitive of the batch was stored.
    pub fn is_success(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Number of primitives stored, new or replacing.
    pub fn stored(&self) -> usize {
        self.inserted + self.replaced
    }
}

/// A set of primitives kept in a BVH.
///
/// Every mutation rebuilds the whole tree from the stored primitives:
/// inserting or removing one primitive costs `O(n log n)`.
/// [`BvhIndex::insert_batch`] stores a whole batch before rebuilding once.
///
/// ```ignore
/// use bvh_tree::{Aabb, BvhIndex, Primitive};
/// use nalgebra::Point3;
///
/// let mut index = BvhIndex::<()>::new();
/// index.insert(Primitive::new("crate", Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))))?;
/// let near = index.aabb_intersection(&query, &Default::default());
/// ```
#[derive(Debug, Clone)]
pub struct BvhIndex<T = (), O = NoopObserver> {
    store: PrimitiveStore<T>,
    bvh: Bvh,
    config: BuildConfig,
    observer: O,
}

impl<T> Default for BvhIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BvhIndex<T> {
    /// Creates an empty index with the default [`BuildConfig`].
    pub fn new() -> Self {
        Self {
            store: PrimitiveStore::new(),
            bvh: Bvh::new(),
            config: BuildConfig::default(),
            observer: NoopObserver,
        }
    }

    /// Creates an empty index with the given configuration.
    pub fn with_config(config: BuildConfig) -> Result<Self, BvhError> {
        Self::with_observer(config, NoopObserver)
    }
}

impl<T, O: IndexObserver> BvhIndex<T, O> {
    /// Creates an empty index notifying `observer` of every operation.
    pub fn with_observer(config: BuildConfig, observer: O) -> Result<Self, BvhError> {
        config.validate()?;
        Ok(Self {
            store: PrimitiveStore::new(),
            bvh: Bvh::new(),
            config,
            observer,
        })
    }

    /// Stores `primitive` and rebuilds the tree.
    ///
    /// A primitive with the same id is replaced (last write wins). Invalid
    /// primitives are refused and leave the index untouched.
    pub fn insert(&mut self, primitive: Primitive<T>) -> Result<InsertOutcome, BvhError> {
        if let Err(error) = validate(&primitive) {
            self.reject(error.clone());
            return Err(error);
        }

        let outcome = self.store_primitive(primitive);
        self.rebuild();
        Ok(outcome)
    }

    /// Stores every valid primitive of `primitives` and rebuilds once.
    ///
    /// Invalid primitives are skipped and reported; the valid ones are
    /// stored regardless.
    pub fn insert_batch<I>(&mut self, primitives: I) -> BatchReport
    where
        I: IntoIterator<Item = Primitive<T>>,
    {
        let mut report = BatchReport::default();

        for primitive in primitives {
            match validate(&primitive) {
                Ok(()) => match self.store_primitive(primitive) {
                    InsertOutcome::Inserted => report.inserted += 1,
                    InsertOutcome::Replaced => report.replaced += 1,
                },
                Err(error) => {
                    self.reject(error.clone());
                    report.rejected.push(error);
                }
            }
        }

        if report.stored() > 0 {
            self.rebuild();
        }
        report
    }

    /// Removes the primitive stored under `id` and rebuilds the tree.
    pub fn remove(&mut self, id: &str) -> Result<Primitive<T>, BvhError> {
        let Some(removed) = self.store.remove(id) else {
            let error = BvhError::NotFound(PrimitiveId::from(id));
            self.reject(error.clone());
            return Err(error);
        };

        self.observer.notify(&IndexEvent::Removed {
            id: removed.id().clone(),
        });
        if self.store.is_empty() {
            self.bvh = Bvh::new();
        } else {
            self.rebuild();
        }
        Ok(removed)
    }

    /// Rebuilds the tree from the stored primitives.
    pub fn rebuild(&mut self) {
        self.bvh = Bvh::build(&self.store, &self.config);
        self.observer.notify(&IndexEvent::Rebuilt {
            primitive_count: self.bvh.primitive_count(),
            node_count: self.bvh.node_count(),
            height: self.bvh.height(),
        });
    }

    /// Removes every primitive and drops the tree.
    pub fn clear(&mut self) {
        self.store.clear();
        self.bvh = Bvh::new();
        self.observer.notify(&IndexEvent::Cleared);
    }

    /// Number of stored primitives.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Primitive<T>> {
        self.store.get(id)
    }

    /// Changes the primitive stored under `id` in place and rebuilds the tree.
    ///
    /// The changed primitive is validated like an inserted one. If it is
    /// refused, its previous bounds and geometry are put back and the tree
    /// is left as it was.
    pub fn update<F>(&mut self, id: &str, f: F) -> Result<(), BvhError>
    where
        F: FnOnce(&mut Primitive<T>),
    {
        let Some(primitive) = self.store.get_mut(id) else {
            let error = BvhError::NotFound(PrimitiveId::from(id));
            self.reject(error.clone());
            return Err(error);
        };

        let bounds = *primitive.bounds();
        let geometry = primitive.geometry().clone();
        f(primitive);

        if let Err(error) = validate(primitive) {
            match geometry {
                Geometry::Triangle(triangle) => primitive.set_triangle(triangle),
                Geometry::Bounds => primitive.set_bounds(bounds),
            }
            self.reject(error.clone());
            return Err(error);
        }

        let id = primitive.id().clone();
        self.observer.notify(&IndexEvent::Updated { id });
        self.rebuild();
        Ok(())
    }

    /// Mutable access to the payload of a stored primitive.
    ///
    /// Payloads play no part in the tree, so nothing is rebuilt.
    pub fn data_mut(&mut self, id: &str) -> Option<&mut T> {
        self.store.get_mut(id).and_then(Primitive::data_mut)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    /// Iterates over the stored primitives in insertion order.
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive<T>> {
        self.store.iter()
    }

    #[inline]
    pub fn store(&self) -> &PrimitiveStore<T> {
        &self.store
    }

    #[inline]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    #[inline]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    #[inline]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Finds the primitives hit by `ray`. See [`Bvh::ray_intersection`].
    pub fn ray_intersection(
        &self,
        ray: &Ray,
        options: &RayQueryOptions<'_, T>,
    ) -> RayQueryResult<'_, T> {
        let result = self.bvh.ray_intersection(&self.store, ray, options);
        self.observer.notify(&IndexEvent::RayQuery {
            hits: result.count(),
            stats: result.stats,
        });
        result
    }

    /// The closest primitive hit by `ray`, if any.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<RayHit<'_, T>> {
        let options = RayQueryOptions::default().with_sort_by_distance(false);
        let result = self.ray_intersection(ray, &options);
        result.closest().copied()
    }

    /// Finds the primitives whose bounds overlap `query`. See
    /// [`Bvh::aabb_intersection`].
    pub fn aabb_intersection(
        &self,
        query: &Aabb,
        options: &AabbQueryOptions<'_, T>,
    ) -> AabbQueryResult<'_, T> {
        let result = self.bvh.aabb_intersection(&self.store, query, options);
        self.observer.notify(&IndexEvent::AabbQuery {
            hits: result.count(),
            stats: result.stats,
        });
        result
    }

    /// Finds the primitives whose bounds contain `point`.
    pub fn point_query(&self, point: &Point3<f32>) -> AabbQueryResult<'_, T> {
        let result = self.bvh.point_query(&self.store, point);
        self.observer.notify(&IndexEvent::AabbQuery {
            hits: result.count(),
            stats: result.stats,
        });
        result
    }

    fn store_primitive(&mut self, primitive: Primitive<T>) -> InsertOutcome {
        let id = primitive.id().clone();
        let replaced = self.store.insert(primitive).is_some();
        self.observer.notify(&IndexEvent::Inserted { id, replaced });
        if replaced {
            InsertOutcome::Replaced
        } else {
            InsertOutcome::Inserted
        }
    }

    fn reject(&self, error: BvhError) {
        warn!("rejected index operation: {error}");
        self.observer.notify(&IndexEvent::Rejected { error });
    }
}

/// Checks that a primitive can be stored: non-empty id, finite bounds and
/// `min <= max` on every axis.
fn validate<T>(primitive: &Primitive<T>) -> Result<(), BvhError> {
    let id = primitive.id();
    if id.is_empty() {
        return Err(BvhError::InvalidId);
    }

    let bounds = primitive.bounds();
    if !bounds.is_finite() {
        return Err(BvhError::NonFiniteBounds { id: id.clone() });
    }
    for axis in 0..3 {
        if bounds.min[axis] > bounds.max[axis] {
            return Err(BvhError::InvalidBounds {
                id: id.clone(),
                axis,
                min: bounds.min[axis],
                max: bounds.max[axis],
            });
        }
    }
    Ok(())
}
