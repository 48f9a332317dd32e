#![forbid(unsafe_code)]

//! Object subscription table.
//!
//! Owns the raw-object to registration mapping together with the two
//! indices that reference it. All three are mutated together so the
//! reverse index never disagrees with the registrations it points at.
//!
//! This is plain single-owner data; [`SubscriptionGraph`](crate::SubscriptionGraph)
//! wraps it for shared use inside a container.

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::host_index::HostIndex;
use crate::local::{Interest, SubscriberMap};
use crate::object::ObjectId;
use crate::reverse_index::ReverseIndex;
use crate::subscriber::Subscriber;

/// Consumers matched by one notify, collected before the sink runs.
pub type Matched = SmallVec<[Subscriber; 8]>;

#[derive(Debug, Default)]
pub struct SubscriptionTable {
    locals: AHashMap<ObjectId, SubscriberMap>,
    reverse: ReverseIndex,
    hosts: HostIndex,
    track_hosts: bool,
}

impl SubscriptionTable {
    #[must_use]
    pub fn new(track_hosts: bool) -> Self {
        Self {
            track_hosts,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.locals.contains_key(&object)
    }

    #[must_use]
    pub fn get(&self, object: ObjectId) -> Option<&SubscriberMap> {
        self.locals.get(&object)
    }

    /// Create `object`'s registration, threading every seeded consumer into
    /// the indices. Returns `false` (and leaves the table untouched) if the
    /// object already has one.
    pub fn create(&mut self, object: ObjectId, seed: Option<SubscriberMap>) -> bool {
        if self.locals.contains_key(&object) {
            return false;
        }
        let map = seed.unwrap_or_default();
        for subscriber in map.keys() {
            self.link(subscriber, object);
        }
        self.locals.insert(object, map);
        true
    }

    fn link(&mut self, subscriber: &Subscriber, object: ObjectId) {
        if self.reverse.track(subscriber, object) {
            trace!(%subscriber, %object, "edge added");
        }
        if self.track_hosts {
            self.hosts.track(subscriber, object);
        }
    }

    /// Record a read. Returns `false` if `object` has no registration.
    pub fn add_subscriber(
        &mut self,
        object: ObjectId,
        subscriber: Subscriber,
        key: Option<&str>,
    ) -> bool {
        let Some(map) = self.locals.get_mut(&object) else {
            return false;
        };
        match map.get_mut(&subscriber) {
            Some(interest) => interest.record(key),
            None => {
                map.insert(subscriber.clone(), Interest::from_first_read(key));
            }
        }
        self.link(&subscriber, object);
        true
    }

    /// Consumers of `object` that a change to `key` concerns, or `None` if
    /// the object has no registration.
    #[must_use]
    pub fn matching(&self, object: ObjectId, key: Option<&str>) -> Option<Matched> {
        let map = self.locals.get(&object)?;
        Some(
            map.iter()
                .filter(|(_, interest)| interest.matches(key))
                .map(|(subscriber, _)| subscriber.clone())
                .collect(),
        )
    }

    /// Remove `subscriber` from every registration it appears in. Returns the
    /// number of registrations it was removed from; zero for an unknown
    /// consumer.
    pub fn clear_subscriber(&mut self, subscriber: &Subscriber) -> usize {
        let Some(objects) = self.reverse.take(subscriber) else {
            return 0;
        };
        let mut removed = 0;
        for object in objects {
            if let Some(map) = self.locals.get_mut(&object)
                && map.remove(subscriber).is_some()
            {
                removed += 1;
            }
        }
        removed
    }

    /// Drop `object`'s registration and every index edge pointing at it.
    /// Returns the number of consumers that were registered.
    pub fn release(&mut self, object: ObjectId) -> usize {
        let Some(map) = self.locals.remove(&object) else {
            return 0;
        };
        for subscriber in map.keys() {
            self.reverse.forget(subscriber, object);
        }
        self.hosts.forget_object(object);
        map.len()
    }

    #[must_use]
    pub fn reverse(&self) -> &ReverseIndex {
        &self.reverse
    }

    #[must_use]
    pub fn hosts(&self) -> &HostIndex {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut HostIndex {
        &mut self.hosts
    }

    /// Iterate every live registration.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SubscriberMap)> + '_ {
        self.locals.iter().map(|(object, map)| (*object, map))
    }

    /// Number of objects with a registration.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    /// Check that the reverse index and the registrations agree edge for
    /// edge. Used by tests and the harness.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let forward: usize = self.locals.values().map(|map| map.len()).sum();
        if forward != self.reverse.edge_count() {
            return false;
        }
        self.locals.iter().all(|(object, map)| {
            map.keys()
                .all(|subscriber| self.reverse.contains(subscriber, *object))
        })
    }
}
