//! Insertion-ordered primitive storage keyed by identifier.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::{Primitive, PrimitiveId};

/// Primitives keyed by their identifier.
///
/// Primitives keep their insertion position; replacing a primitive keeps the
/// position of the one it replaces and removing one shifts the later ones
/// down. Positions are what BVH leaves refer to, so a [`Bvh`](crate::Bvh)
/// is only meaningful for the store state it was built from.
#[derive(Debug, Clone)]
pub struct PrimitiveStore<T = ()> {
    primitives: IndexMap<PrimitiveId, Primitive<T>>,
}

impl<T> Default for PrimitiveStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PrimitiveStore<T> {
    pub fn new() -> Self {
        Self {
            primitives: IndexMap::new(),
        }
    }

    /// Stores `primitive`, returning the one it replaced if its id was
    /// already present.
    pub fn insert(&mut self, primitive: Primitive<T>) -> Option<Primitive<T>> {
        match self.primitives.entry(primitive.id().clone()) {
            Entry::Occupied(mut entry) => Some(entry.insert(primitive)),
            Entry::Vacant(entry) => {
                entry.insert(primitive);
                None
            }
        }
    }

    /// Removes and returns the primitive stored under `id`.
    pub fn remove(&mut self, id: &str) -> Option<Primitive<T>> {
        self.primitives.shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Primitive<T>> {
        self.primitives.get(id)
    }

    /// Mutable access to a stored primitive. The primitive's id cannot be
    /// changed through it; bounds changes take effect on the next rebuild.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Primitive<T>> {
        self.primitives.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.primitives.contains_key(id)
    }

    /// The primitive at insertion position `index`.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&Primitive<T>> {
        self.primitives.get_index(index).map(|(_, p)| p)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Iterates over the primitives in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Primitive<T>> {
        self.primitives.values()
    }
}

impl<T> FromIterator<Primitive<T>> for PrimitiveStore<T> {
    fn from_iter<I: IntoIterator<Item = Primitive<T>>>(iter: I) -> Self {
        let mut store = Self::new();
        for primitive in iter {
            store.insert(primitive);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Aabb;
    use nalgebra::Point3;

    fn unit_box(id: &str, x: f32) -> Primitive {
        Primitive::new(
            id,
            Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0)),
        )
    }

    #[test]
    fn insert_and_get() {
        let mut store = PrimitiveStore::new();
        assert!(store.insert(unit_box("a", 0.0)).is_none());
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().bounds().min.x, 0.0);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut store: PrimitiveStore = [unit_box("a", 0.0), unit_box("b", 2.0)]
            .into_iter()
            .collect();

        let old = store.insert(unit_box("a", 5.0)).unwrap();
        assert_eq!(old.bounds().min.x, 0.0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_index(0).unwrap().id().as_str(), "a");
        assert_eq!(store.get_index(0).unwrap().bounds().min.x, 5.0);
    }

    #[test]
    fn remove_shifts_later_positions() {
        let mut store: PrimitiveStore = [unit_box("a", 0.0), unit_box("b", 2.0), unit_box("c", 4.0)]
            .into_iter()
            .collect();

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        let ids: Vec<&str> = store.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn clear_empties() {
        let mut store: PrimitiveStore = [unit_box("a", 0.0)].into_iter().collect();
        store.clear();
        assert!(store.is_empty());
        assert!(store.get_index(0).is_none());
    }
}
