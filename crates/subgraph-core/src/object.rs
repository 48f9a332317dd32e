#![forbid(unsafe_code)]

//! Tracked-object arena with generational handles.
//!
//! Every observable value in a container is addressed by an [`ObjectId`].
//! The arena hands those ids out and remembers, for each slot, whether it
//! is a raw tracked object or a proxy wrapped around one. Subscription state
//! is never stored here; the table keys it by the raw id out-of-band and is
//! told to drop it when the arena frees the slot.
//!
//! # Invariants
//!
//! 1. A freed slot bumps its generation, so an id held past `free()` never
//!    matches the object that later reuses the slot.
//! 2. A raw object has at most one proxy. Asking for the proxy of a proxy
//!    returns the proxy itself.
//! 3. Freeing a raw object also frees its proxy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generational handle to a tracked object or its proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Rebuild an id from its parts (snapshot import, tests).
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at the time this id was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}v{}", self.index, self.generation)
    }
}

/// What a live slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// The unwrapped tracked object. Only raw ids may own registrations.
    Raw,
    /// A reactive wrapper whose reads and writes are forwarded to `target`.
    Proxy { target: ObjectId },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    kind: Option<ObjectKind>,
    /// Cached proxy for a raw slot.
    proxy: Option<ObjectId>,
}

/// Arena of tracked objects and their proxies.
#[derive(Debug, Default)]
pub struct ObjectArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ObjectArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new raw tracked object.
    pub fn alloc(&mut self) -> ObjectId {
        self.alloc_kind(ObjectKind::Raw)
    }

    fn alloc_kind(&mut self, kind: ObjectKind) -> ObjectId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.kind = Some(kind);
            slot.proxy = None;
            return ObjectId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            kind: Some(kind),
            proxy: None,
        });
        ObjectId {
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.kind.is_some())
    }

    /// Kind of a live id, `None` once freed.
    #[must_use]
    pub fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.slot(id).and_then(|slot| slot.kind)
    }

    #[must_use]
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    /// The raw object behind a proxy, or `None` if `id` is not a live proxy.
    #[must_use]
    pub fn proxy_target(&self, id: ObjectId) -> Option<ObjectId> {
        match self.kind(id) {
            Some(ObjectKind::Proxy { target }) => Some(target),
            _ => None,
        }
    }

    /// Strip a proxy down to its raw target. Raw ids pass through.
    #[must_use]
    pub fn raw_of(&self, id: ObjectId) -> ObjectId {
        self.proxy_target(id).unwrap_or(id)
    }

    /// Get or create the proxy wrapping `target`.
    ///
    /// Returns `None` if `target` is not live.
    pub fn proxy_of(&mut self, target: ObjectId) -> Option<ObjectId> {
        let slot = self.slot(target)?;
        match slot.kind {
            Some(ObjectKind::Proxy { .. }) => Some(target),
            _ => {
                if let Some(existing) = slot.proxy {
                    return Some(existing);
                }
                let proxy = self.alloc_kind(ObjectKind::Proxy { target });
                self.slots[target.index as usize].proxy = Some(proxy);
                Some(proxy)
            }
        }
    }

    /// Free a raw object and its proxy. Returns every id that was released,
    /// raw first. Freeing a proxy directly only detaches it from its target.
    pub fn free(&mut self, id: ObjectId) -> Vec<ObjectId> {
        let Some(kind) = self.kind(id) else {
            return Vec::new();
        };
        let mut released = vec![id];
        match kind {
            ObjectKind::Raw => {
                if let Some(proxy) = self.slots[id.index as usize].proxy.take() {
                    self.release_slot(proxy);
                    released.push(proxy);
                }
            }
            ObjectKind::Proxy { target } => {
                if let Some(slot) = self.slots.get_mut(target.index as usize) {
                    slot.proxy = None;
                }
            }
        }
        self.release_slot(id);
        released
    }

    fn release_slot(&mut self, id: ObjectId) {
        let slot = &mut self.slots[id.index as usize];
        slot.kind = None;
        slot.proxy = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
    }

    /// Number of live ids (raw and proxy).
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_yields_distinct_raw_ids() {
        let mut arena = ObjectArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        assert_ne!(a, b);
        assert_eq!(arena.kind(a), Some(ObjectKind::Raw));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn proxy_is_cached_per_target() {
        let mut arena = ObjectArena::new();
        let obj = arena.alloc();
        let p1 = arena.proxy_of(obj).unwrap();
        let p2 = arena.proxy_of(obj).unwrap();
        assert_eq!(p1, p2);
        assert_ne!(p1, obj);
        assert_eq!(arena.proxy_target(p1), Some(obj));
        assert_eq!(arena.raw_of(p1), obj);
        assert_eq!(arena.raw_of(obj), obj);
    }

    #[test]
    fn proxy_of_proxy_is_identity() {
        let mut arena = ObjectArena::new();
        let obj = arena.alloc();
        let proxy = arena.proxy_of(obj).unwrap();
        assert_eq!(arena.proxy_of(proxy), Some(proxy));
    }

    #[test]
    fn free_releases_proxy_and_bumps_generation() {
        let mut arena = ObjectArena::new();
        let obj = arena.alloc();
        let proxy = arena.proxy_of(obj).unwrap();

        let released = arena.free(obj);
        assert_eq!(released, vec![obj, proxy]);
        assert!(!arena.is_live(obj));
        assert!(!arena.is_live(proxy));
        assert!(arena.is_empty());

        let reused = arena.alloc();
        assert_eq!(reused.index(), obj.index());
        assert_ne!(reused, obj);
        assert_eq!(arena.kind(proxy), None);
    }

    #[test]
    fn free_stale_id_is_noop() {
        let mut arena = ObjectArena::new();
        let obj = arena.alloc();
        arena.free(obj);
        assert!(arena.free(obj).is_empty());
        assert_eq!(arena.proxy_of(obj), None);
    }

    #[test]
    fn freeing_proxy_detaches_it() {
        let mut arena = ObjectArena::new();
        let obj = arena.alloc();
        let proxy = arena.proxy_of(obj).unwrap();
        assert_eq!(arena.free(proxy), vec![proxy]);
        assert!(arena.is_live(obj));
        let fresh = arena.proxy_of(obj).unwrap();
        assert_ne!(fresh, proxy);
    }

    #[test]
    fn display_format() {
        let id = ObjectId::from_raw_parts(3, 7);
        assert_eq!(id.to_string(), "obj#3v7");
    }
}
