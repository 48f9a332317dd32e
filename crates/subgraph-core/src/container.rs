#![forbid(unsafe_code)]

//! Containers: one isolated execution context with its own object arena
//! and subscription graph.
//!
//! Objects are tracked through [`Container::track`], which returns a
//! [`Tracked`] guard. Dropping the guard frees the object, its proxy, and
//! its registration, so subscription state never outlives the object it
//! describes.

use std::rc::{Rc, Weak};

use crate::config::GraphConfig;
use crate::error::Result;
use crate::graph::{Shared, SubscriptionGraph};
use crate::local::LocalRegistration;
use crate::notify::{ContainerContext, NotifySink};
use crate::object::{ObjectId, ObjectKind};

/// An isolated execution context owning exactly one subscription graph.
#[derive(Debug, Clone)]
pub struct Container {
    graph: SubscriptionGraph,
}

impl Container {
    /// Create a container whose notifications go to `sink`.
    ///
    /// A sink that captures a [`SubscriptionGraph`] or [`LocalRegistration`]
    /// of this container forms an `Rc` cycle; drop those handles to free it.
    pub fn new(config: GraphConfig, sink: impl NotifySink + 'static) -> Self {
        Self {
            graph: SubscriptionGraph::new(config, Box::new(sink)),
        }
    }

    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionGraph {
        &self.graph
    }

    #[must_use]
    pub fn context(&self) -> &ContainerContext {
        self.graph.context()
    }

    /// Start tracking a new object.
    #[must_use]
    pub fn track(&self) -> Tracked {
        let id = self.graph.shared.objects.borrow_mut().alloc();
        Tracked {
            id,
            shared: Rc::downgrade(&self.graph.shared),
        }
    }

    /// Get or create the proxy wrapping `object`. `None` if it is not live.
    pub fn proxy(&self, object: ObjectId) -> Option<ObjectId> {
        self.graph.shared.objects.borrow_mut().proxy_of(object)
    }

    /// Strip a proxy down to the raw object it wraps.
    #[must_use]
    pub fn raw_of(&self, object: ObjectId) -> ObjectId {
        self.graph.shared.objects.borrow().raw_of(object)
    }

    #[must_use]
    pub fn kind(&self, object: ObjectId) -> Option<ObjectKind> {
        self.graph.shared.objects.borrow().kind(object)
    }

    #[must_use]
    pub fn is_live(&self, object: ObjectId) -> bool {
        self.graph.shared.objects.borrow().is_live(object)
    }

    /// Release `object` now instead of waiting for its guard to drop.
    /// Returns `false` if it was already released.
    pub fn release(&self, object: ObjectId) -> bool {
        self.graph.shared.release_object(object)
    }
}

/// Guard for one tracked object.
///
/// Holds only a weak reference to its container. Dropping it releases the
/// object if the container is still alive.
#[derive(Debug)]
pub struct Tracked {
    id: ObjectId,
    shared: Weak<Shared>,
}

impl Tracked {
    /// The raw object id.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Get or create this object's proxy.
    #[must_use]
    pub fn proxy(&self) -> Option<ObjectId> {
        let shared = self.shared.upgrade()?;
        shared.objects.borrow_mut().proxy_of(self.id)
    }

    /// This object's registration, created on first use.
    ///
    /// # Errors
    ///
    /// [`GraphError::StaleObject`](crate::GraphError::StaleObject) if the
    /// object was already released, including when its container is gone.
    pub fn local(&self) -> Result<LocalRegistration> {
        match self.shared.upgrade() {
            Some(shared) => SubscriptionGraph { shared }.get_or_create_local(self.id, None),
            None => Err(crate::GraphError::StaleObject { object: self.id }),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.release_object(self.id);
        }
    }
}
