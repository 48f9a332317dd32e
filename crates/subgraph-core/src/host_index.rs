#![forbid(unsafe_code)]

//! Host-keyed secondary index.
//!
//! Every time a consumer that resolves to a host (the host itself, or one of
//! its signal operations) is added to a registration, the host is linked to
//! that registration here. Nothing in the graph reads this index for
//! disposal or lookup; it is kept as a standalone component so a bulk
//! dispose-by-host pass can be built on it. Entries are pruned when the
//! tracked object is released, and [`HostIndex::remove_host`] drops a host
//! outright.
//!
//! Population can be switched off with
//! [`GraphConfig::track_hosts`](crate::config::GraphConfig::track_hosts).

use ahash::{AHashMap, AHashSet};

use crate::object::ObjectId;
use crate::subscriber::{HostId, Subscriber};

#[derive(Debug, Default)]
pub struct HostIndex {
    by_host: AHashMap<HostId, AHashSet<ObjectId>>,
    by_object: AHashMap<ObjectId, AHashSet<HostId>>,
}

impl HostIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `subscriber`'s host to `object`. Returns the host when the
    /// consumer resolves to one.
    pub fn track(&mut self, subscriber: &Subscriber, object: ObjectId) -> Option<HostId> {
        let host = subscriber.host()?;
        self.by_host.entry(host).or_default().insert(object);
        self.by_object.entry(object).or_default().insert(host);
        Some(host)
    }

    /// Unlink `object` from every host that touched it, including hosts whose
    /// consumers have since been cleared. Returns how many hosts were linked.
    pub fn forget_object(&mut self, object: ObjectId) -> usize {
        let Some(hosts) = self.by_object.remove(&object) else {
            return 0;
        };
        for host in &hosts {
            if let Some(objects) = self.by_host.get_mut(host) {
                objects.remove(&object);
                if objects.is_empty() {
                    self.by_host.remove(host);
                }
            }
        }
        hosts.len()
    }

    /// Drop every link for `host`, returning the registrations it touched.
    pub fn remove_host(&mut self, host: HostId) -> AHashSet<ObjectId> {
        let objects = self.by_host.remove(&host).unwrap_or_default();
        for object in &objects {
            if let Some(hosts) = self.by_object.get_mut(object) {
                hosts.remove(&host);
                if hosts.is_empty() {
                    self.by_object.remove(object);
                }
            }
        }
        objects
    }

    /// Registrations touched by `host` or its operations.
    pub fn registrations_of(&self, host: HostId) -> impl Iterator<Item = ObjectId> + '_ {
        self.by_host
            .get(&host)
            .into_iter()
            .flat_map(|objects| objects.iter().copied())
    }

    /// Number of hosts with at least one link.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_host.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }
}
