#![forbid(unsafe_code)]

//! Reverse consumer index: consumer to the registrations it appears in.
//!
//! Disposal walks this index instead of scanning every tracked object, so
//! tearing a consumer down costs O(registrations for that consumer).
//!
//! # Invariants
//!
//! 1. `(sub, obj)` is present here iff `sub` is a key of `obj`'s registration
//!    in the subscription table.
//! 2. A consumer with no edges has no entry.

use ahash::{AHashMap, AHashSet};

use crate::object::ObjectId;
use crate::subscriber::Subscriber;

#[derive(Debug, Default)]
pub struct ReverseIndex {
    edges: AHashMap<Subscriber, AHashSet<ObjectId>>,
    edge_count: usize,
}

impl ReverseIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subscriber` is registered on `object`. Returns `true` if
    /// the edge is new.
    pub fn track(&mut self, subscriber: &Subscriber, object: ObjectId) -> bool {
        let inserted = match self.edges.get_mut(subscriber) {
            Some(objects) => objects.insert(object),
            None => {
                let mut objects = AHashSet::with_capacity(1);
                objects.insert(object);
                self.edges.insert(subscriber.clone(), objects);
                true
            }
        };
        if inserted {
            self.edge_count += 1;
        }
        inserted
    }

    /// Remove and return every registration `subscriber` appears in.
    pub fn take(&mut self, subscriber: &Subscriber) -> Option<AHashSet<ObjectId>> {
        let objects = self.edges.remove(subscriber)?;
        self.edge_count -= objects.len();
        Some(objects)
    }

    /// Drop a single edge, removing the consumer's entry if it empties.
    pub fn forget(&mut self, subscriber: &Subscriber, object: ObjectId) {
        if let Some(objects) = self.edges.get_mut(subscriber)
            && objects.remove(&object)
        {
            self.edge_count -= 1;
            if objects.is_empty() {
                self.edges.remove(subscriber);
            }
        }
    }

    #[must_use]
    pub fn contains(&self, subscriber: &Subscriber, object: ObjectId) -> bool {
        self.edges
            .get(subscriber)
            .is_some_and(|objects| objects.contains(&object))
    }

    /// Registrations `subscriber` currently appears in.
    pub fn registrations_of(&self, subscriber: &Subscriber) -> impl Iterator<Item = ObjectId> + '_ {
        self.edges
            .get(subscriber)
            .into_iter()
            .flat_map(|objects| objects.iter().copied())
    }

    /// Number of consumers with at least one edge.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of (consumer, registration) edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
