//! Per-process mark-and-sweep heap.
//!
//! Objects live in a slot arena addressed by [`Ref`] indices, so the
//! object graph may contain arbitrary sharing and cycles without any
//! ownership gymnastics. A collection marks everything reachable from the
//! supplied roots, sweeps the rest, and clears marks on survivors.
//!
//! The heap itself only implements the mechanism; the policy (when to
//! collect, which roots exist) lives with the process core, which is the
//! only place that can see every root source.

use crate::object::{Object, Payload, Ref};

/// Live-set size that triggers the first collection. Doubles after every
/// threshold-triggered collection.
pub const INITIAL_GC_THRESHOLD: usize = 256;

#[derive(Debug)]
pub struct Heap {
    slots: Vec<Option<Object>>,
    free: Vec<u32>,
    live: usize,
    threshold: usize,
    collections: u64,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            threshold: INITIAL_GC_THRESHOLD,
            collections: 0,
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn collections(&self) -> u64 {
        self.collections
    }

    pub fn should_collect(&self) -> bool {
        self.live >= self.threshold
    }

    pub fn double_threshold(&mut self) {
        self.threshold *= 2;
    }

    pub fn insert(&mut self, obj: Object) -> Ref {
        self.live += 1;
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(obj);
                Ref(i)
            }
            None => {
                self.slots.push(Some(obj));
                Ref((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, r: Ref) -> &Object {
        self.slots[r.0 as usize]
            .as_ref()
            .expect("internal error: stale object reference")
    }

    pub fn get_mut(&mut self, r: Ref) -> &mut Object {
        self.slots[r.0 as usize]
            .as_mut()
            .expect("internal error: stale object reference")
    }

    pub fn contains(&self, r: Ref) -> bool {
        self.slots
            .get(r.0 as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    // ── Property access through the prototype chain ─────────────────────

    /// Chain lookup: own map first, then the parent chain.
    pub fn resolve(&self, mut r: Ref, key: &str) -> Option<Ref> {
        loop {
            let obj = self.get(r);
            if let Some(v) = obj.get_own(key) {
                return Some(v);
            }
            match obj.parent {
                Some(p) => r = p,
                None => return None,
            }
        }
    }

    pub fn has_property(&self, r: Ref, key: &str) -> bool {
        self.resolve(r, key).is_some()
    }

    pub fn has_own_property(&self, r: Ref, key: &str) -> bool {
        self.get(r).get_own(key).is_some()
    }

    /// Writes always land in the immediate map. Null refuses writes.
    pub fn set_property(&mut self, r: Ref, key: String, val: Ref) -> bool {
        let obj = self.get_mut(r);
        if matches!(obj.payload, Payload::Null) {
            return false;
        }
        obj.props.insert(key, val);
        true
    }

    // ── Collection ──────────────────────────────────────────────────────

    /// Mark from `roots`, sweep everything unmarked, clear marks on
    /// survivors. Returns the number of objects freed.
    pub fn collect(&mut self, roots: Vec<Ref>) -> usize {
        self.collections += 1;

        let mut work = roots;
        while let Some(r) = work.pop() {
            let Some(obj) = self.slots[r.0 as usize].as_mut() else {
                continue;
            };
            if obj.marked {
                continue;
            }
            obj.marked = true;
            obj.trace(&mut work);
        }

        let mut freed = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(obj) if obj.marked => obj.marked = false,
                Some(_) => {
                    *slot = None;
                    self.free.push(i as u32);
                    freed += 1;
                }
                None => {}
            }
        }
        self.live -= freed;
        freed
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}
