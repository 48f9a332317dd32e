#![forbid(unsafe_code)]

//! A notify sink that records every call.
//!
//! Unlike [`PendingQueue`](subgraph_core::PendingQueue) nothing is
//! deduplicated, so tests can assert the graph's exactly-once-per-notify
//! guarantee directly.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use subgraph_core::{ContainerContext, ContainerId, NotifySink, Subscriber};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub seq: u64,
    pub subscriber: Subscriber,
    pub container: ContainerId,
}

#[derive(Debug, Default)]
struct Log {
    next_seq: u64,
    entries: Vec<Notification>,
}

/// Shared recording sink. Clones append to the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Rc<RefCell<Log>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut self.log.borrow_mut().entries)
    }

    /// Remove everything recorded so far and return the consumers, sorted.
    pub fn take_sorted(&self) -> Vec<Subscriber> {
        let mut subs: Vec<Subscriber> = self.take().into_iter().map(|n| n.subscriber).collect();
        subs.sort_unstable();
        subs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending entries as JSONL, one object per line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let log = self.log.borrow();
        let mut out = String::new();
        for entry in &log.entries {
            if !out.is_empty() {
                out.push('\n');
            }
            let line = json!({
                "event": "notify",
                "seq": entry.seq,
                "container": entry.container.raw(),
                "kind": entry.subscriber.kind_name(),
                "subscriber": entry.subscriber.to_string(),
            });
            out.push_str(&line.to_string());
        }
        out
    }
}

impl NotifySink for RecordingSink {
    fn notify(&self, subscriber: &Subscriber, cx: &ContainerContext) {
        let mut log = self.log.borrow_mut();
        let seq = log.next_seq;
        log.next_seq += 1;
        log.entries.push(Notification {
            seq,
            subscriber: subscriber.clone(),
            container: cx.id(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subgraph_core::{Container, GraphConfig, HostId, TaskId};

    #[test]
    fn records_duplicates_across_notifies() {
        let sink = RecordingSink::new();
        let container = Container::new(GraphConfig::default(), sink.clone());
        let obj = container.track();
        let local = obj.local().unwrap();
        local.add_subscriber(HostId(1), None);

        local.notify(None);
        local.notify(Some("x"));
        let taken = sink.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].seq + 1, taken[1].seq);
        assert!(sink.is_empty());
    }

    #[test]
    fn jsonl_has_one_line_per_call() {
        let sink = RecordingSink::new();
        let container = Container::new(GraphConfig::default(), sink.clone());
        let obj = container.track();
        let local = obj.local().unwrap();
        local.add_subscriber(HostId(1), None);
        local.add_subscriber(TaskId(2), None);
        local.notify(None);

        let jsonl = sink.to_jsonl();
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["event"], "notify");
            assert_eq!(value["container"], container.context().id().raw());
        }
    }
}
