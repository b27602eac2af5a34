//! Scope table: names to references.
//!
//! Open addressing with linear probing over a power-of-two bucket array. The
//! probe origin is the name's precomputed hash masked by `capacity - 1`.
//!
//! Occupied buckets are threaded on an intrusive list of bucket indices:
//! `next` runs head to tail in insertion order and ends in `NIL`, `prev` is
//! circular (the head's `prev` is the tail). Iteration walks the list, so it
//! never scans empty buckets and preserves insertion order across rehashes
//! and erasures.
//!
//! # Invariants
//!
//! - The load factor never exceeds 0.5 after an insertion, so every probe
//!   sequence meets an empty bucket.
//! - Capacity only grows. `clear` keeps the bucket array.
//!
//! # Hints
//!
//! `get_hint` returns the bucket index of a name. `use_hint` re-validates such
//! an index in O(1). A hint stays valid until the next rehash; afterwards it
//! may miss (return `None`), and the caller falls back to `find`.

use mica_ir::Name;

use crate::reference::Reference;

const NIL: usize = usize::MAX;
const MIN_CAPACITY: usize = 8;

#[derive(Debug)]
struct Bucket {
    entry: Option<(Name, Reference)>,
    next: usize,
    prev: usize,
}

impl Bucket {
    fn empty() -> Self {
        Bucket {
            entry: None,
            next: NIL,
            prev: NIL,
        }
    }
}

#[derive(Debug)]
pub struct ReferenceDictionary {
    buckets: Vec<Bucket>,
    head: usize,
    size: usize,
}

impl Default for ReferenceDictionary {
    fn default() -> Self {
        ReferenceDictionary {
            buckets: Vec::new(),
            head: NIL,
            size: 0,
        }
    }
}

impl ReferenceDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of buckets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    #[inline]
    fn origin(&self, name: &Name) -> usize {
        (name.prehash() as usize) & (self.buckets.len() - 1)
    }

    fn find_index(&self, name: &Name) -> Option<usize> {
        if self.buckets.is_empty() {
            return None;
        }
        let mask = self.buckets.len() - 1;
        let mut i = self.origin(name);
        loop {
            match &self.buckets[i].entry {
                None => return None,
                Some((key, _)) if key == name => return Some(i),
                Some(_) => i = (i + 1) & mask,
            }
        }
    }

    pub fn find(&self, name: &Name) -> Option<&Reference> {
        let i = self.find_index(name)?;
        self.buckets[i].entry.as_ref().map(|(_, r)| r)
    }

    pub fn find_mut(&mut self, name: &Name) -> Option<&mut Reference> {
        let i = self.find_index(name)?;
        self.buckets[i].entry.as_mut().map(|(_, r)| r)
    }

    /// Bucket index of `name`, for later `use_hint`.
    #[inline]
    pub fn get_hint(&self, name: &Name) -> Option<usize> {
        self.find_index(name)
    }

    /// Look `name` up at a cached bucket index.
    #[inline]
    pub fn use_hint(&self, hint: usize, name: &Name) -> Option<&Reference> {
        match &self.buckets.get(hint)?.entry {
            Some((key, r)) if key == name => Some(r),
            _ => None,
        }
    }

    #[inline]
    pub fn use_hint_mut(&mut self, hint: usize, name: &Name) -> Option<&mut Reference> {
        match &mut self.buckets.get_mut(hint)?.entry {
            Some((key, r)) if key == name => Some(r),
            _ => None,
        }
    }

    /// Insert `name` bound to an uninitialized reference.
    ///
    /// Returns the slot and `true` for a new name, or the existing slot and
    /// `false`. An existing entry is never overwritten.
    pub fn insert(&mut self, name: Name) -> (&mut Reference, bool) {
        if let Some(i) = self.find_index(&name) {
            let (_, existing) = self.buckets[i]
                .entry
                .get_or_insert_with(|| (name, Reference::uninit()));
            return (existing, false);
        }
        if self.size >= self.buckets.len() / 2 {
            let capacity = (self.buckets.len() * 2).max(MIN_CAPACITY);
            self.rehash(capacity);
        }
        let i = self.probe_empty(&name);
        self.attach(i);
        self.size += 1;
        let (_, inserted) = self.buckets[i].entry.insert((name, Reference::uninit()));
        (inserted, true)
    }

    /// Remove `name`. Returns whether it was present.
    pub fn erase(&mut self, name: &Name) -> bool {
        let Some(i) = self.find_index(name) else {
            return false;
        };
        self.detach(i);
        self.buckets[i].entry = None;
        self.size -= 1;
        self.backward_shift(i);
        true
    }

    /// Remove every entry; capacity is kept.
    pub fn clear(&mut self) {
        let mut i = self.head;
        while i != NIL {
            let bucket = &mut self.buckets[i];
            let next = bucket.next;
            *bucket = Bucket::empty();
            i = next;
        }
        self.head = NIL;
        self.size = 0;
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buckets: &self.buckets,
            current: self.head,
        }
    }

    fn probe_empty(&self, name: &Name) -> usize {
        let mask = self.buckets.len() - 1;
        let mut i = self.origin(name);
        while self.buckets[i].entry.is_some() {
            i = (i + 1) & mask;
        }
        i
    }

    /// Link bucket `i` at the tail of the list.
    fn attach(&mut self, i: usize) {
        if self.head == NIL {
            self.head = i;
            self.buckets[i].next = NIL;
            self.buckets[i].prev = i;
            return;
        }
        let tail = self.buckets[self.head].prev;
        self.buckets[tail].next = i;
        self.buckets[i].prev = tail;
        self.buckets[i].next = NIL;
        let head = self.head;
        self.buckets[head].prev = i;
    }

    /// Unlink bucket `i` from the list.
    fn detach(&mut self, i: usize) {
        let prev = self.buckets[i].prev;
        let next = self.buckets[i].next;
        if self.head == i {
            self.head = next;
            if next != NIL {
                self.buckets[next].prev = prev;
            }
        } else {
            self.buckets[prev].next = next;
            if next == NIL {
                let head = self.head;
                self.buckets[head].prev = prev;
            } else {
                self.buckets[next].prev = prev;
            }
        }
        self.buckets[i].next = NIL;
        self.buckets[i].prev = NIL;
    }

    /// Move the entry at `from` into the empty bucket `to`, keeping its list
    /// position.
    fn relocate(&mut self, from: usize, to: usize) {
        let entry = self.buckets[from].entry.take();
        let next = self.buckets[from].next;
        let prev = self.buckets[from].prev;
        self.buckets[from].next = NIL;
        self.buckets[from].prev = NIL;
        self.buckets[to] = Bucket { entry, next, prev };

        if self.head == from {
            self.head = to;
        } else {
            self.buckets[prev].next = to;
        }
        if next == NIL {
            let head = self.head;
            self.buckets[head].prev = to;
        } else {
            self.buckets[next].prev = to;
        }
    }

    /// Close the gap at `hole` left by an erasure.
    fn backward_shift(&mut self, mut hole: usize) {
        let mask = self.buckets.len() - 1;
        let mut j = (hole + 1) & mask;
        loop {
            let origin = match &self.buckets[j].entry {
                Some((name, _)) => self.origin(name),
                None => break,
            };
            // An entry may fill the hole unless its origin lies cyclically
            // in (hole, j].
            let stays = if hole <= j {
                hole < origin && origin <= j
            } else {
                hole < origin || origin <= j
            };
            if !stays {
                self.relocate(j, hole);
                hole = j;
            }
            j = (j + 1) & mask;
        }
    }

    fn rehash(&mut self, capacity: usize) {
        debug_assert!(capacity.is_power_of_two());
        let mut old = std::mem::replace(
            &mut self.buckets,
            std::iter::repeat_with(Bucket::empty).take(capacity).collect(),
        );
        let mut i = self.head;
        self.head = NIL;
        while i != NIL {
            let next = old[i].next;
            if let Some((name, reference)) = old[i].entry.take() {
                let slot = self.probe_empty(&name);
                self.buckets[slot].entry = Some((name, reference));
                self.attach(slot);
            }
            i = next;
        }
        tracing::debug!(size = self.size, capacity, "scope table rehashed");
    }
}

/// Insertion-order iterator over a `ReferenceDictionary`.
pub struct Iter<'a> {
    buckets: &'a [Bucket],
    current: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Name, &'a Reference);

    fn next(&mut self) -> Option<Self::Item> {
        let bucket = self.buckets.get(self.current)?;
        self.current = bucket.next;
        bucket.entry.as_ref().map(|(name, r)| (name, r))
    }
}

impl<'a> IntoIterator for &'a ReferenceDictionary {
    type Item = (&'a Name, &'a Reference);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests;
