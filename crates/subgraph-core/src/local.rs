#![forbid(unsafe_code)]

//! Per-object registrations.
//!
//! A tracked object's registration maps each interested [`Subscriber`] to an
//! [`Interest`]: either every property of the object, or a set of property
//! keys. [`LocalRegistration`] is the handle the reactive proxy layer holds
//! for one object; reads call [`add_subscriber`](LocalRegistration::add_subscriber)
//! and writes call [`notify`](LocalRegistration::notify).
//!
//! # Merge rules
//!
//! - Adding without a key makes the consumer all-keys, replacing any key set.
//! - Adding with a key inserts it into the consumer's key set. An all-keys
//!   consumer stays all-keys; there is no downgrade.
//!
//! # Matching
//!
//! A consumer is notified for `notify(key)` when its interest is all-keys,
//! when `key` is `None` or empty, or when `key` is in its key set. An empty
//! key only counts as unqualified on the write side; reading `""` records it
//! as a key.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use tracing::{trace, warn};

use crate::graph::Shared;
use crate::object::ObjectId;
use crate::subscriber::Subscriber;

/// How much of an object a consumer depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interest {
    /// Any change to the object.
    AllKeys,
    /// Changes to these property keys, or unqualified changes.
    Keys(AHashSet<Box<str>>),
}

impl Interest {
    /// Build a key-set interest.
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Box<str>>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn is_all_keys(&self) -> bool {
        matches!(self, Self::AllKeys)
    }

    /// Whether a change to `key` (or to the whole object when `None` or
    /// empty) concerns this interest.
    #[must_use]
    pub fn matches(&self, key: Option<&str>) -> bool {
        match (self, key) {
            (Self::AllKeys, _) | (_, None | Some("")) => true,
            (Self::Keys(keys), Some(key)) => keys.contains(key),
        }
    }

    /// Key names, sorted. Empty for all-keys.
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<&str> {
        match self {
            Self::AllKeys => Vec::new(),
            Self::Keys(keys) => {
                let mut out: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
                out.sort_unstable();
                out
            }
        }
    }

    /// Fold one read into this interest following the merge rules.
    pub(crate) fn record(&mut self, key: Option<&str>) {
        match key {
            None => *self = Self::AllKeys,
            Some(key) => {
                if let Self::Keys(keys) = self
                    && !keys.contains(key)
                {
                    keys.insert(key.into());
                }
            }
        }
    }

    pub(crate) fn from_first_read(key: Option<&str>) -> Self {
        match key {
            None => Self::AllKeys,
            Some(key) => Self::keys([key]),
        }
    }
}

/// Consumer to interest mapping for one tracked object. Also the seed-map
/// type accepted by
/// [`get_or_create_local`](crate::graph::SubscriptionGraph::get_or_create_local).
pub type SubscriberMap = AHashMap<Subscriber, Interest>;

/// Handle to one object's registration.
///
/// Cloning a handle is cheap and shares the same registration. A handle
/// outliving its object is inert: adds are dropped and notifies reach no one.
#[derive(Clone)]
pub struct LocalRegistration {
    shared: Rc<Shared>,
    object: ObjectId,
}

impl std::fmt::Debug for LocalRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRegistration")
            .field("object", &self.object)
            .field("subscribers", &self.len())
            .finish()
    }
}

impl LocalRegistration {
    pub(crate) fn new(shared: Rc<Shared>, object: ObjectId) -> Self {
        Self { shared, object }
    }

    /// The raw object this registration belongs to.
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Record that `subscriber` read `key` (or the whole object when `None`).
    ///
    /// Also records the edge in the reverse consumer index so that
    /// [`clear_subscriber`](crate::graph::SubscriptionGraph::clear_subscriber)
    /// can find this registration later.
    pub fn add_subscriber(&self, subscriber: impl Into<Subscriber>, key: Option<&str>) {
        let subscriber = subscriber.into();
        let added = self
            .shared
            .table
            .borrow_mut()
            .add_subscriber(self.object, subscriber, key);
        if !added {
            warn!(object = %self.object, "add_subscriber on a released registration");
        }
    }

    /// Hand every consumer interested in `key` to the container's notify sink.
    ///
    /// Matching consumers are collected before the sink runs and no borrow of
    /// the graph is held across sink calls, so the sink may register reads
    /// on other objects or dispose consumers. Returns the number of consumers
    /// handed to the sink.
    pub fn notify(&self, key: Option<&str>) -> usize {
        let matched = {
            let table = self.shared.table.borrow();
            match table.matching(self.object, key) {
                Some(matched) => matched,
                None => {
                    warn!(object = %self.object, "notify on a released registration");
                    return 0;
                }
            }
        };
        trace!(object = %self.object, key = ?key, matched = matched.len(), "notify");
        for subscriber in &matched {
            self.shared.sink.notify(subscriber, &self.shared.cx);
        }
        matched.len()
    }

    /// Number of consumers registered on this object.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .table
            .borrow()
            .get(self.object)
            .map_or(0, |subs| subs.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, subscriber: &Subscriber) -> bool {
        self.shared
            .table
            .borrow()
            .get(self.object)
            .is_some_and(|subs| subs.contains_key(subscriber))
    }

    /// A copy of `subscriber`'s current interest.
    #[must_use]
    pub fn interest(&self, subscriber: &Subscriber) -> Option<Interest> {
        self.shared
            .table
            .borrow()
            .get(self.object)
            .and_then(|subs| subs.get(subscriber).cloned())
    }

    /// Registered consumers in sorted order.
    #[must_use]
    pub fn subscribers(&self) -> Vec<Subscriber> {
        let mut out: Vec<Subscriber> = self
            .shared
            .table
            .borrow()
            .get(self.object)
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Whether the object behind this handle still has a registration.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.shared.table.borrow().contains(self.object)
    }
}
