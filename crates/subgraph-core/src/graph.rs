#![forbid(unsafe_code)]

//! The subscription graph facade.
//!
//! One [`SubscriptionGraph`] exists per container. It exposes the three
//! operations the reactive layer needs ([`try_get_local`], [`get_or_create_local`],
//! [`clear_subscriber`]) and routes every notification through the single
//! [`NotifySink`] supplied at construction.
//!
//! # Architecture
//!
//! The graph uses `Rc<RefCell<..>>` for single-threaded shared ownership,
//! like the rest of the reactive layer. Registration handles hold a strong
//! reference to the shared state; [`Tracked`](crate::Tracked) guards hold a
//! weak one so they never keep a container alive.
//!
//! # Invariants
//!
//! 1. Only raw, live object ids own registrations. Proxy ids are always
//!    rejected by `get_or_create_local`; identity checks only decide whether
//!    `try_get_local` panics on one or reports it absent.
//! 2. A consumer is in an object's registration iff the reverse index links
//!    the consumer to that object.
//! 3. No `RefCell` borrow is held while the sink runs.
//!
//! [`try_get_local`]: SubscriptionGraph::try_get_local
//! [`get_or_create_local`]: SubscriptionGraph::get_or_create_local
//! [`clear_subscriber`]: SubscriptionGraph::clear_subscriber

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::local::{LocalRegistration, SubscriberMap};
use crate::notify::{ContainerContext, NotifySink};
use crate::object::{ObjectArena, ObjectId};
use crate::snapshot::GraphSnapshot;
use crate::subscriber::{HostId, Subscriber};
use crate::table::SubscriptionTable;

/// State shared by a container, its graph and every handle.
pub(crate) struct Shared {
    pub(crate) cx: ContainerContext,
    pub(crate) config: GraphConfig,
    pub(crate) sink: Box<dyn NotifySink>,
    pub(crate) objects: RefCell<ObjectArena>,
    pub(crate) table: RefCell<SubscriptionTable>,
}

impl Shared {
    /// Proxy ids never own registrations, whatever the configuration says.
    fn reject_proxy(&self, object: ObjectId) -> Result<()> {
        match self.objects.borrow().proxy_target(object) {
            Some(target) => Err(GraphError::ProxyIdentity { object, target }),
            None => Ok(()),
        }
    }

    /// Free `object` (and its proxy) and drop every registration edge that
    /// referenced them.
    pub(crate) fn release_object(&self, object: ObjectId) -> bool {
        let released = self.objects.borrow_mut().free(object);
        if released.is_empty() {
            return false;
        }
        let mut table = self.table.borrow_mut();
        let dropped: usize = released.iter().map(|id| table.release(*id)).sum();
        debug!(
            container = %self.cx.id(),
            %object,
            subscribers = dropped,
            "object released"
        );
        true
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("container", &self.cx.id())
            .finish_non_exhaustive()
    }
}

/// Counters describing the graph's current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    /// Live ids in the object arena, proxies included.
    pub objects: usize,
    /// Objects with a registration.
    pub registrations: usize,
    /// Consumers with at least one reverse-index edge.
    pub subscribers: usize,
    /// Total (consumer, registration) edges.
    pub edges: usize,
    /// Hosts in the host-keyed secondary index.
    pub hosts: usize,
}

/// Per-container subscription graph.
///
/// Cloning a graph creates a new handle to the **same** state.
#[derive(Clone)]
pub struct SubscriptionGraph {
    pub(crate) shared: Rc<Shared>,
}

impl std::fmt::Debug for SubscriptionGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGraph")
            .field("container", &self.shared.cx.id())
            .field("stats", &self.stats())
            .finish()
    }
}

impl SubscriptionGraph {
    pub(crate) fn new(config: GraphConfig, sink: Box<dyn NotifySink>) -> Self {
        let table = SubscriptionTable::new(config.track_hosts);
        Self {
            shared: Rc::new(Shared {
                cx: ContainerContext::new(config.label.clone()),
                config,
                sink,
                objects: RefCell::new(ObjectArena::new()),
                table: RefCell::new(table),
            }),
        }
    }

    #[must_use]
    pub fn context(&self) -> &ContainerContext {
        &self.shared.cx
    }

    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.shared.config
    }

    /// Look up `object`'s registration without creating one.
    ///
    /// # Panics
    ///
    /// Panics if identity checks are enabled and `object` is a proxy. With
    /// checks disabled a proxy id simply has no registration and `None` is
    /// returned.
    #[must_use]
    pub fn try_get_local(&self, object: ObjectId) -> Option<LocalRegistration> {
        if let Err(err) = self.shared.reject_proxy(object) {
            if self.shared.config.identity_checks {
                panic!("{err}");
            }
            return None;
        }
        self.shared
            .table
            .borrow()
            .contains(object)
            .then(|| LocalRegistration::new(Rc::clone(&self.shared), object))
    }

    /// Return `object`'s registration, creating it if needed.
    ///
    /// A `seed` pre-populates a new registration (reattaching state captured
    /// before a resume); every seeded consumer is linked in the reverse index
    /// so later disposal still finds it.
    ///
    /// # Errors
    ///
    /// - [`GraphError::ProxyIdentity`] if `object` is a proxy, with or without
    ///   identity checks.
    /// - [`GraphError::StaleObject`] if `object` is not live.
    /// - [`GraphError::Reseed`] if a `seed` is given and the object already
    ///   has a registration.
    pub fn get_or_create_local(
        &self,
        object: ObjectId,
        seed: Option<SubscriberMap>,
    ) -> Result<LocalRegistration> {
        self.shared.reject_proxy(object)?;
        if !self.shared.objects.borrow().is_live(object) {
            return Err(GraphError::StaleObject { object });
        }
        {
            let mut table = self.shared.table.borrow_mut();
            if table.contains(object) {
                if seed.is_some() {
                    return Err(GraphError::Reseed { object });
                }
            } else {
                table.create(object, seed);
            }
        }
        Ok(LocalRegistration::new(Rc::clone(&self.shared), object))
    }

    /// Remove `subscriber` from every registration it appears in.
    ///
    /// Idempotent: an unknown or already-cleared consumer is a no-op.
    /// Returns the number of registrations the consumer was removed from.
    pub fn clear_subscriber(&self, subscriber: &Subscriber) -> usize {
        let removed = self.shared.table.borrow_mut().clear_subscriber(subscriber);
        if removed > 0 {
            debug!(
                container = %self.shared.cx.id(),
                %subscriber,
                registrations = removed,
                "subscriber cleared"
            );
        }
        removed
    }

    /// Registrations the consumer is currently linked to, sorted.
    #[must_use]
    pub fn registrations_of(&self, subscriber: &Subscriber) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = self
            .shared
            .table
            .borrow()
            .reverse()
            .registrations_of(subscriber)
            .collect();
        out.sort_unstable();
        out
    }

    /// Registrations touched by `host` or its operations, from the
    /// host-keyed secondary index. Sorted.
    #[must_use]
    pub fn host_registrations(&self, host: HostId) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = self
            .shared
            .table
            .borrow()
            .hosts()
            .registrations_of(host)
            .collect();
        out.sort_unstable();
        out
    }

    /// Drop `host` from the host-keyed secondary index. Registrations are
    /// not touched.
    pub fn forget_host(&self, host: HostId) -> usize {
        self.shared.table.borrow_mut().hosts_mut().remove_host(host).len()
    }

    /// Capture every non-empty registration.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.shared.table.borrow())
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let objects = self.shared.objects.borrow().len();
        let table = self.shared.table.borrow();
        GraphStats {
            objects,
            registrations: table.len(),
            subscribers: table.reverse().len(),
            edges: table.reverse().edge_count(),
            hosts: table.hosts().len(),
        }
    }

    /// Whether the reverse index agrees with every registration.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.shared.table.borrow().is_consistent()
    }
}
