#![forbid(unsafe_code)]

//! Naive reference model of the subscription graph.
//!
//! Ordered maps, no reverse index: disposal scans every object. Slow on
//! purpose, so that it is obviously correct and can serve as the oracle
//! for the real graph.

use std::collections::{BTreeMap, BTreeSet};

use subgraph_core::Subscriber;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelInterest {
    AllKeys,
    Keys(BTreeSet<String>),
}

impl ModelInterest {
    fn matches(&self, key: Option<&str>) -> bool {
        match (self, key) {
            (Self::AllKeys, _) | (_, None | Some("")) => true,
            (Self::Keys(keys), Some(key)) => keys.contains(key),
        }
    }
}

/// Per-slot registrations. `None` marks a released slot.
#[derive(Debug, Clone, Default)]
pub struct Model {
    slots: Vec<Option<BTreeMap<Subscriber, ModelInterest>>>,
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new object; returns its slot.
    pub fn track(&mut self) -> usize {
        self.slots.push(Some(BTreeMap::new()));
        self.slots.len() - 1
    }

    pub fn release(&mut self, slot: usize) -> bool {
        self.slots
            .get_mut(slot)
            .is_some_and(|entry| entry.take().is_some())
    }

    #[must_use]
    pub fn is_live(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(Option::is_some)
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn add(&mut self, slot: usize, subscriber: Subscriber, key: Option<&str>) {
        let Some(Some(map)) = self.slots.get_mut(slot) else {
            return;
        };
        let interest = map
            .entry(subscriber)
            .or_insert_with(|| ModelInterest::Keys(BTreeSet::new()));
        match key {
            None => *interest = ModelInterest::AllKeys,
            Some(key) => {
                if let ModelInterest::Keys(keys) = interest {
                    keys.insert(key.to_string());
                }
            }
        }
    }

    /// Consumers a write to `key` on `slot` must reach.
    #[must_use]
    pub fn notify(&self, slot: usize, key: Option<&str>) -> Vec<Subscriber> {
        match self.slots.get(slot) {
            Some(Some(map)) => map
                .iter()
                .filter(|(_, interest)| interest.matches(key))
                .map(|(sub, _)| sub.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Remove `subscriber` everywhere; returns how many objects it was on.
    pub fn clear(&mut self, subscriber: &Subscriber) -> usize {
        self.slots
            .iter_mut()
            .flatten()
            .map(|map| map.remove(subscriber).is_some())
            .filter(|removed| *removed)
            .count()
    }

    /// Objects `subscriber` is registered on, by slot.
    #[must_use]
    pub fn slots_of(&self, subscriber: &Subscriber) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, map)| {
                map.as_ref()
                    .filter(|map| map.contains_key(subscriber))
                    .map(|_| slot)
            })
            .collect()
    }

    /// Total (consumer, object) edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.slots.iter().flatten().map(BTreeMap::len).sum()
    }
}
