#![forbid(unsafe_code)]

//! Capture and reattach subscription state across a pause/resume.
//!
//! A [`GraphSnapshot`] lists every non-empty registration with its
//! consumers and interests in sorted order, so equal graphs produce equal
//! snapshots. Restoring maps each captured object id onto a live object in
//! the target container and seeds a fresh registration for it.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::SubscriptionGraph;
use crate::local::{Interest, SubscriberMap};
use crate::object::ObjectId;
use crate::subscriber::Subscriber;
use crate::table::SubscriptionTable;

/// Serialized form of an [`Interest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotInterest {
    AllKeys,
    Keys(Vec<String>),
}

impl From<&Interest> for SnapshotInterest {
    fn from(interest: &Interest) -> Self {
        match interest {
            Interest::AllKeys => Self::AllKeys,
            Interest::Keys(_) => Self::Keys(
                interest
                    .sorted_keys()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            ),
        }
    }
}

impl SnapshotInterest {
    #[must_use]
    pub fn to_interest(&self) -> Interest {
        match self {
            Self::AllKeys => Interest::AllKeys,
            Self::Keys(keys) => Interest::keys(keys.iter().map(String::as_str)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSubscriber {
    pub subscriber: Subscriber,
    pub interest: SnapshotInterest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub object: ObjectId,
    pub subscribers: Vec<SnapshotSubscriber>,
}

impl SnapshotEntry {
    /// The seed map this entry reattaches.
    #[must_use]
    pub fn seed(&self) -> SubscriberMap {
        self.subscribers
            .iter()
            .map(|s| (s.subscriber.clone(), s.interest.to_interest()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl GraphSnapshot {
    pub(crate) fn capture(table: &SubscriptionTable) -> Self {
        let mut entries: Vec<SnapshotEntry> = table
            .iter()
            .filter(|(_, map)| !map.is_empty())
            .map(|(object, map)| {
                let mut subscribers: Vec<SnapshotSubscriber> = map
                    .iter()
                    .map(|(subscriber, interest)| SnapshotSubscriber {
                        subscriber: subscriber.clone(),
                        interest: interest.into(),
                    })
                    .collect();
                subscribers.sort_unstable_by(|a, b| a.subscriber.cmp(&b.subscriber));
                SnapshotEntry {
                    object,
                    subscribers,
                }
            })
            .collect();
        entries.sort_unstable_by_key(|entry| entry.object);
        Self { entries }
    }

    /// Reattach every entry whose object `resolve` maps to a live object in
    /// `graph`. Unresolved entries are skipped. Returns the number restored.
    ///
    /// # Errors
    ///
    /// Propagates the first [`get_or_create_local`](SubscriptionGraph::get_or_create_local)
    /// failure, typically [`GraphError::Reseed`](crate::GraphError::Reseed)
    /// when a target object already has a registration. Entries before the
    /// failing one stay restored.
    pub fn restore(
        &self,
        graph: &SubscriptionGraph,
        mut resolve: impl FnMut(ObjectId) -> Option<ObjectId>,
    ) -> Result<usize> {
        let mut restored = 0;
        for entry in &self.entries {
            let Some(target) = resolve(entry.object) else {
                continue;
            };
            graph.get_or_create_local(target, Some(entry.seed()))?;
            restored += 1;
        }
        Ok(restored)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::HostId;

    #[test]
    fn capture_is_sorted_and_skips_empty() {
        let mut table = SubscriptionTable::new(true);
        let a = ObjectId::from_raw_parts(1, 0);
        let b = ObjectId::from_raw_parts(0, 0);
        let empty = ObjectId::from_raw_parts(2, 0);
        table.create(a, None);
        table.create(b, None);
        table.create(empty, None);
        table.add_subscriber(a, Subscriber::from(HostId(2)), Some("y"));
        table.add_subscriber(a, Subscriber::from(HostId(2)), Some("x"));
        table.add_subscriber(a, Subscriber::from(HostId(1)), None);
        table.add_subscriber(b, Subscriber::from(HostId(1)), None);

        let snap = GraphSnapshot::capture(&table);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.entries[0].object, b);
        assert_eq!(snap.entries[1].object, a);
        let subs = &snap.entries[1].subscribers;
        assert_eq!(subs[0].subscriber, Subscriber::from(HostId(1)));
        assert_eq!(subs[0].interest, SnapshotInterest::AllKeys);
        assert_eq!(
            subs[1].interest,
            SnapshotInterest::Keys(vec!["x".into(), "y".into()])
        );
    }

    #[test]
    fn interest_conversion_preserves_keys() {
        let interest = Interest::keys(["b", "a"]);
        let snap = SnapshotInterest::from(&interest);
        assert_eq!(snap.to_interest(), interest);
    }
}
