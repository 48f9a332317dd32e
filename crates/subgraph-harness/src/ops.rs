#![forbid(unsafe_code)]

//! Operation alphabet for driving a container from generated input.
//!
//! Every field is a small integer so proptest strategies and fuzz inputs can
//! produce operations directly; [`subscriber`] and [`key`] map them onto a
//! fixed pool of consumers and property names, which keeps collisions (the
//! interesting case) frequent.

use std::fmt;

use subgraph_core::{HostId, OpDescriptor, SignalOperation, Subscriber, TaskId};

/// Size of the consumer pool addressed by [`subscriber`].
pub const SUBSCRIBER_POOL: u8 = 8;

/// Property names addressed by [`key`].
pub const KEYS: [&str; 4] = ["count", "label", "items", "open"];

/// One step applied to both the real graph and the reference model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Track a new object in the next slot.
    Track,
    /// Drop the guard of the object in `slot`.
    Release { slot: u8 },
    /// Consumer `sub` reads `key` (or the whole object) of `slot`.
    Add { slot: u8, sub: u8, key: Option<u8> },
    /// The same read attempted through the object's proxy id. The graph must
    /// reject it and register nothing.
    AddViaProxy { slot: u8, sub: u8, key: Option<u8> },
    /// Write `key` (or the whole object) of `slot`.
    Notify { slot: u8, key: Option<u8> },
    /// Dispose consumer `sub`.
    Clear { sub: u8 },
}

/// Consumer for a pool index: hosts, then signal operations on host 0 and
/// host 1, then tasks.
#[must_use]
pub fn subscriber(index: u8) -> Subscriber {
    match index % SUBSCRIBER_POOL {
        i @ 0..=3 => Subscriber::from(HostId(u64::from(i))),
        4 => Subscriber::from(SignalOperation::new(HostId(0), OpDescriptor::text(0))),
        5 => Subscriber::from(SignalOperation::new(
            HostId(1),
            OpDescriptor::property(0, "value"),
        )),
        i => Subscriber::from(TaskId(u64::from(i))),
    }
}

#[must_use]
pub fn key(index: Option<u8>) -> Option<&'static str> {
    index.map(|i| KEYS[usize::from(i) % KEYS.len()])
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Track => write!(f, "track"),
            Self::Release { slot } => write!(f, "release #{slot}"),
            Self::Add { slot, sub, key: k } => {
                write!(f, "add {} to #{slot} key={:?}", subscriber(sub), key(k))
            }
            Self::AddViaProxy { slot, sub, key: k } => {
                write!(f, "add {} to proxy of #{slot} key={:?}", subscriber(sub), key(k))
            }
            Self::Notify { slot, key: k } => write!(f, "notify #{slot} key={:?}", key(k)),
            Self::Clear { sub } => write!(f, "clear {}", subscriber(sub)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_covers_every_variant() {
        let kinds: Vec<&str> = (0..SUBSCRIBER_POOL)
            .map(|i| subscriber(i).kind_name())
            .collect();
        assert!(kinds.contains(&"host"));
        assert!(kinds.contains(&"operation"));
        assert!(kinds.contains(&"task"));
    }

    #[test]
    fn indices_wrap() {
        assert_eq!(subscriber(0), subscriber(SUBSCRIBER_POOL));
        assert_eq!(key(Some(0)), key(Some(KEYS.len() as u8)));
        assert_eq!(key(None), None);
    }

    #[test]
    fn display_is_readable() {
        let op = Op::Add {
            slot: 1,
            sub: 0,
            key: Some(0),
        };
        assert_eq!(op.to_string(), "add host:0 to #1 key=Some(\"count\")");
    }

    #[test]
    fn proxy_read_names_the_proxy() {
        let op = Op::AddViaProxy {
            slot: 2,
            sub: 0,
            key: None,
        };
        assert_eq!(op.to_string(), "add host:0 to proxy of #2 key=None");
    }
}
