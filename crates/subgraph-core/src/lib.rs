#![forbid(unsafe_code)]

//! Reactive subscription graph.
//!
//! Tracks, for every observable object in a container, which consumers must
//! be told when it changes and at what granularity, and tears that
//! bookkeeping down when a consumer is disposed or an object is released.
//!
//! - [`Container`]: one isolated execution context. Owns the object arena
//!   and exactly one [`SubscriptionGraph`].
//! - [`SubscriptionGraph`]: `try_get_local`, `get_or_create_local`,
//!   `clear_subscriber`, plus snapshots and stats.
//! - [`LocalRegistration`]: per-object handle. Reads call `add_subscriber`,
//!   writes call `notify`.
//! - [`NotifySink`]: where matching consumers go. [`PendingQueue`] stages
//!   them for a scheduler.
//!
//! # Example
//!
//! ```
//! use subgraph_core::{Container, GraphConfig, HostId, PendingQueue};
//!
//! let queue = PendingQueue::new();
//! let container = Container::new(GraphConfig::default(), queue.clone());
//!
//! let state = container.track();
//! let local = state.local().unwrap();
//! local.add_subscriber(HostId(1), None);
//! local.add_subscriber(HostId(2), Some("count"));
//!
//! local.notify(Some("label"));
//! assert_eq!(queue.drain().hosts, vec![HostId(1)]);
//! ```
//!
//! # Threading
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Registration,
//! notification and disposal all complete synchronously; nothing blocks or
//! awaits.

pub mod config;
pub mod container;
pub mod error;
pub mod graph;
pub mod host_index;
pub mod local;
pub mod notify;
pub mod object;
pub mod reverse_index;
pub mod snapshot;
pub mod subscriber;
pub mod table;

pub use config::GraphConfig;
pub use container::{Container, Tracked};
pub use error::{GraphError, Result};
pub use graph::{GraphStats, SubscriptionGraph};
pub use local::{Interest, LocalRegistration, SubscriberMap};
pub use notify::{ContainerContext, ContainerId, NotifySink, NullSink, PendingBatch, PendingQueue};
pub use object::{ObjectId, ObjectKind};
pub use snapshot::{GraphSnapshot, SnapshotEntry, SnapshotInterest, SnapshotSubscriber};
pub use subscriber::{HostId, OpDescriptor, OpKind, SignalOperation, Subscriber, TaskId};
