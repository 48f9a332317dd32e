#![forbid(unsafe_code)]

//! Consumer identities.
//!
//! A [`Subscriber`] is anything that reads tracked state and must be told
//! when that state changes: a renderable host, a signal operation bound to
//! one node of a host, or a free-standing task. Identity is structural per
//! variant; two signal operations are the same consumer only when both the
//! owning host and the operation descriptor match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a renderable unit (component instance or element).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(pub u64);

impl HostId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Identity of an effect or watch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What a signal operation writes when its signal changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    /// Replace the text content of a node.
    Text,
    /// Set a property or attribute on an element.
    Property,
}

/// The node-level target of a signal operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpDescriptor {
    pub kind: OpKind,
    /// Node index inside the owning host.
    pub node: u32,
    /// Property name for [`OpKind::Property`].
    pub prop: Option<Box<str>>,
}

impl OpDescriptor {
    #[must_use]
    pub const fn text(node: u32) -> Self {
        Self {
            kind: OpKind::Text,
            node,
            prop: None,
        }
    }

    #[must_use]
    pub fn property(node: u32, prop: impl Into<Box<str>>) -> Self {
        Self {
            kind: OpKind::Property,
            node,
            prop: Some(prop.into()),
        }
    }
}

/// A derived binding owned by a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalOperation {
    pub host: HostId,
    pub op: OpDescriptor,
}

impl SignalOperation {
    #[must_use]
    pub fn new(host: HostId, op: OpDescriptor) -> Self {
        Self { host, op }
    }
}

/// A consumer of tracked state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subscriber {
    Host(HostId),
    Operation(SignalOperation),
    Task(TaskId),
}

impl Subscriber {
    /// The host this consumer renders into, if any.
    #[must_use]
    pub fn host(&self) -> Option<HostId> {
        match self {
            Self::Host(host) => Some(*host),
            Self::Operation(op) => Some(op.host),
            Self::Task(_) => None,
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Host(_) => "host",
            Self::Operation(_) => "operation",
            Self::Task(_) => "task",
        }
    }
}

impl From<HostId> for Subscriber {
    fn from(host: HostId) -> Self {
        Self::Host(host)
    }
}

impl From<SignalOperation> for Subscriber {
    fn from(op: SignalOperation) -> Self {
        Self::Operation(op)
    }
}

impl From<TaskId> for Subscriber {
    fn from(task: TaskId) -> Self {
        Self::Task(task)
    }
}

impl fmt::Display for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(host) => write!(f, "host:{}", host.0),
            Self::Operation(SignalOperation { host, op }) => match &op.prop {
                Some(prop) => write!(f, "op:{}/{:?}@{}.{}", host.0, op.kind, op.node, prop),
                None => write!(f, "op:{}/{:?}@{}", host.0, op.kind, op.node),
            },
            Self::Task(task) => write!(f, "task:{}", task.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn host_resolution() {
        let host = HostId(7);
        assert_eq!(Subscriber::from(host).host(), Some(host));

        let op = SignalOperation::new(host, OpDescriptor::text(2));
        assert_eq!(Subscriber::from(op).host(), Some(host));

        assert_eq!(Subscriber::from(TaskId(1)).host(), None);
    }

    #[test]
    fn operation_identity_needs_both_parts() {
        let a = Subscriber::from(SignalOperation::new(HostId(1), OpDescriptor::text(0)));
        let same = Subscriber::from(SignalOperation::new(HostId(1), OpDescriptor::text(0)));
        let other_host = Subscriber::from(SignalOperation::new(HostId(2), OpDescriptor::text(0)));
        let other_op =
            Subscriber::from(SignalOperation::new(HostId(1), OpDescriptor::property(0, "value")));

        assert_eq!(a, same);
        assert_ne!(a, other_host);
        assert_ne!(a, other_op);

        let set: AHashSet<Subscriber> = [a, same, other_host, other_op].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn variants_never_collide() {
        assert_ne!(Subscriber::from(HostId(5)), Subscriber::from(TaskId(5)));
    }

    #[test]
    fn display_format() {
        assert_eq!(Subscriber::from(HostId(3)).to_string(), "host:3");
        assert_eq!(Subscriber::from(TaskId(9)).to_string(), "task:9");
        let op = SignalOperation::new(HostId(3), OpDescriptor::property(4, "class"));
        assert_eq!(Subscriber::from(op).to_string(), "op:3/Property@4.class");
    }
}
