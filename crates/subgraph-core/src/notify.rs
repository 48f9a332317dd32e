#![forbid(unsafe_code)]

//! Notification boundary between the graph and whatever schedules work.
//!
//! The graph never decides when a consumer re-runs. It hands each matching
//! consumer, together with the [`ContainerContext`] it belongs to, to the
//! [`NotifySink`] the container was built with. A sink should enqueue and
//! return; it must not block.
//!
//! [`PendingQueue`] is a ready-made sink that stages consumers into
//! deduplicated queues for a scheduler to drain.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;

use crate::subscriber::{HostId, SignalOperation, Subscriber, TaskId};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

fn next_container_id() -> ContainerId {
    ContainerId(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Process-unique identity of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Passed to the sink with every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerContext {
    id: ContainerId,
    label: Option<String>,
}

impl ContainerContext {
    pub(crate) fn new(label: Option<String>) -> Self {
        Self {
            id: next_container_id(),
            label,
        }
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Receives consumers whose dependencies changed.
///
/// Called once per matching consumer per `notify`. Deduplication across
/// several `notify` calls is the sink's business.
pub trait NotifySink {
    fn notify(&self, subscriber: &Subscriber, cx: &ContainerContext);
}

impl<F> NotifySink for F
where
    F: Fn(&Subscriber, &ContainerContext),
{
    fn notify(&self, subscriber: &Subscriber, cx: &ContainerContext) {
        self(subscriber, cx);
    }
}

/// A sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotifySink for NullSink {
    fn notify(&self, _subscriber: &Subscriber, _cx: &ContainerContext) {}
}

/// Staged consumers drained from a [`PendingQueue`], each list in first-
/// notified order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBatch {
    pub hosts: Vec<HostId>,
    pub operations: Vec<SignalOperation>,
    pub tasks: Vec<TaskId>,
}

impl PendingBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len() + self.operations.len() + self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Staging {
    seen: AHashSet<Subscriber>,
    batch: PendingBatch,
}

/// Deduplicating staging sink.
///
/// Cloning shares the same queues, so one clone can be moved into a
/// container as its sink while another is kept for draining.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    staging: Rc<RefCell<Staging>>,
}

impl PendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `subscriber`. Returns `false` if it was already pending.
    pub fn push(&self, subscriber: &Subscriber) -> bool {
        let mut staging = self.staging.borrow_mut();
        if !staging.seen.insert(subscriber.clone()) {
            return false;
        }
        match subscriber {
            Subscriber::Host(host) => staging.batch.hosts.push(*host),
            Subscriber::Operation(op) => staging.batch.operations.push(op.clone()),
            Subscriber::Task(task) => staging.batch.tasks.push(*task),
        }
        true
    }

    /// Take everything staged so far.
    pub fn drain(&self) -> PendingBatch {
        let mut staging = self.staging.borrow_mut();
        staging.seen.clear();
        std::mem::take(&mut staging.batch)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.staging.borrow().seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, subscriber: &Subscriber) -> bool {
        self.staging.borrow().seen.contains(subscriber)
    }
}

impl NotifySink for PendingQueue {
    fn notify(&self, subscriber: &Subscriber, _cx: &ContainerContext) {
        self.push(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::OpDescriptor;

    #[test]
    fn container_ids_are_unique() {
        let a = ContainerContext::new(None);
        let b = ContainerContext::new(Some("b".into()));
        assert_ne!(a.id(), b.id());
        assert_eq!(b.label(), Some("b"));
    }

    #[test]
    fn queue_dedups_and_keeps_order() {
        let queue = PendingQueue::new();
        let cx = ContainerContext::new(None);
        let op = SignalOperation::new(HostId(1), OpDescriptor::text(0));

        queue.notify(&Subscriber::from(HostId(2)), &cx);
        queue.notify(&Subscriber::from(HostId(1)), &cx);
        queue.notify(&Subscriber::from(HostId(2)), &cx);
        queue.notify(&Subscriber::from(op.clone()), &cx);
        queue.notify(&Subscriber::from(TaskId(5)), &cx);
        assert_eq!(queue.len(), 4);

        let batch = queue.drain();
        assert_eq!(batch.hosts, vec![HostId(2), HostId(1)]);
        assert_eq!(batch.operations, vec![op]);
        assert_eq!(batch.tasks, vec![TaskId(5)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drained_consumers_can_be_staged_again() {
        let queue = PendingQueue::new();
        let host = Subscriber::from(HostId(1));
        assert!(queue.push(&host));
        assert!(!queue.push(&host));
        queue.drain();
        assert!(queue.push(&host));
    }

    #[test]
    fn closures_are_sinks() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let hits_clone = Rc::clone(&hits);
        let sink = move |sub: &Subscriber, _cx: &ContainerContext| {
            hits_clone.borrow_mut().push(sub.clone());
        };
        let cx = ContainerContext::new(None);
        sink.notify(&Subscriber::from(TaskId(1)), &cx);
        assert_eq!(hits.borrow().len(), 1);
    }
}
