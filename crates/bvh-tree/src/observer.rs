//! Observer hooks for index mutations and queries.
//!
//! Observers are handed to a [`BvhIndex`](crate::BvhIndex) when it is created
//! and notified synchronously, on the calling thread, after each operation.

use std::cell::RefCell;

use crate::{BvhError, PrimitiveId, QueryStats};

/// Something that happened to a [`BvhIndex`](crate::BvhIndex).
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    /// A primitive was stored; `replaced` is set when it overwrote one with
    /// the same id.
    Inserted { id: PrimitiveId, replaced: bool },
    /// A primitive was refused and not stored.
    Rejected { error: BvhError },
    /// A stored primitive was changed in place.
    Updated { id: PrimitiveId },
    /// A primitive was removed.
    Removed { id: PrimitiveId },
    /// The tree was rebuilt from the store.
    Rebuilt {
        primitive_count: usize,
        node_count: usize,
        height: usize,
    },
    /// The tree and the store were emptied.
    Cleared,
    /// A ray query completed.
    RayQuery { hits: usize, stats: QueryStats },
    /// A volume or point query completed.
    AabbQuery { hits: usize, stats: QueryStats },
}

/// Receiver of [`IndexEvent`]s.
///
/// Queries only borrow the index, so observers are notified through a
/// shared reference; observers that record events use interior mutability.
pub trait IndexObserver {
    fn notify(&self, event: &IndexEvent);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IndexObserver for NoopObserver {
    #[inline]
    fn notify(&self, _event: &IndexEvent) {}
}

/// An observer that records every event.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RefCell<Vec<IndexEvent>>,
}

impl CollectingObserver {
    /// Creates a new empty collecting observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<IndexEvent> {
        self.events.borrow().clone()
    }

    /// Returns the recorded events, leaving the observer empty.
    pub fn take_events(&self) -> Vec<IndexEvent> {
        self.events.take()
    }
}

impl IndexObserver for CollectingObserver {
    fn notify(&self, event: &IndexEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// An observer that calls a closure for each event.
pub struct FnObserver<F>
where
    F: Fn(&IndexEvent),
{
    func: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&IndexEvent),
{
    /// Creates a new observer from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> IndexObserver for FnObserver<F>
where
    F: Fn(&IndexEvent),
{
    fn notify(&self, event: &IndexEvent) {
        (self.func)(event);
    }
}

impl<O: IndexObserver + ?Sized> IndexObserver for &O {
    fn notify(&self, event: &IndexEvent) {
        (**self).notify(event);
    }
}
