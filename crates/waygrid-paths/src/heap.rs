//! Fixed-capacity binary heap with decrease-key and O(1) membership.
//!
//! Unlike [`std::collections::BinaryHeap`], [`PriorityHeap`] knows where every
//! item sits, so it can re-sift an item whose priority improved and answer
//! "is this item queued?" without scanning. Items are identified by a dense
//! [`HeapItem::key`]; the heap alone maintains the key → slot table.

use std::cmp::Ordering;

/// An item that can live in a [`PriorityHeap`].
pub trait HeapItem: Copy {
    /// Dense identifier of the item. Must be below the heap capacity.
    fn key(&self) -> usize;

    /// `Less` when `self` should leave the heap before `other`.
    fn priority_cmp(&self, other: &Self) -> Ordering;
}

/// Sentinel slot for keys that were never inserted.
const NO_SLOT: usize = usize::MAX;

/// Array-backed min-heap over [`HeapItem::priority_cmp`].
#[derive(Debug, Clone)]
pub struct PriorityHeap<T> {
    items: Vec<T>,
    /// `slots[key]` is the last slot the item with `key` occupied.
    slots: Vec<usize>,
    count: usize,
}

impl<T: HeapItem> PriorityHeap<T> {
    /// Create a heap holding at most `capacity` items with keys in
    /// `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slots: vec![NO_SLOT; capacity],
            count: 0,
        }
    }

    /// Maximum number of items (and the exclusive upper bound on keys).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of queued items.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Queue `item`.
    ///
    /// # Panics
    ///
    /// If the heap is full or the key is out of range. Both mean the caller
    /// inserted an item twice without removing it.
    pub fn add(&mut self, item: T) {
        let key = item.key();
        assert!(
            self.count < self.capacity() && key < self.capacity(),
            "heap overflow: count {} key {} capacity {}",
            self.count,
            key,
            self.capacity()
        );
        let slot = self.count;
        if slot < self.items.len() {
            self.items[slot] = item;
        } else {
            self.items.push(item);
        }
        self.slots[key] = slot;
        self.count += 1;
        self.sift_up(slot);
    }

    /// Remove and return the highest-priority item, or `None` when empty.
    pub fn remove_root(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let root = self.items[0];
        self.count -= 1;
        if self.count > 0 {
            let last = self.items[self.count];
            self.place(0, last);
            self.sift_down(0);
        }
        Some(root)
    }

    /// Replace a queued item with an improved copy and restore heap order.
    ///
    /// Only moves the item towards the root: priorities may only improve.
    /// Items that are not queued are ignored.
    pub fn update_item(&mut self, item: T) {
        debug_assert!(self.contains(&item), "update_item on an item that is not queued");
        let Some(slot) = self.slot_of(&item) else {
            return;
        };
        self.items[slot] = item;
        self.sift_up(slot);
    }

    /// Whether an item with the same key is currently queued.
    #[inline]
    pub fn contains(&self, item: &T) -> bool {
        self.slot_of(item).is_some()
    }

    /// The queued copy of an item with the same key.
    #[inline]
    pub fn get(&self, item: &T) -> Option<&T> {
        self.slot_of(item).map(|slot| &self.items[slot])
    }

    /// The highest-priority item without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        if self.count == 0 {
            None
        } else {
            Some(&self.items[0])
        }
    }

    /// Forget every queued item. O(1): storage and stale slots are kept and
    /// simply treated as absent.
    #[inline]
    pub fn clear(&mut self) {
        self.count = 0;
    }

    // -----------------------------------------------------------------------
    // internals
    // -----------------------------------------------------------------------

    #[inline]
    fn slot_of(&self, item: &T) -> Option<usize> {
        let key = item.key();
        let slot = *self.slots.get(key)?;
        // Stale slots point past `count` or at an item with another key.
        (slot < self.count && self.items[slot].key() == key).then_some(slot)
    }

    #[inline]
    fn place(&mut self, slot: usize, item: T) {
        self.slots[item.key()] = slot;
        self.items[slot] = item;
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.slots[self.items[a].key()] = a;
        self.slots[self.items[b].key()] = b;
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            // Equal priorities stay put.
            if self.items[slot].priority_cmp(&self.items[parent]) != Ordering::Less {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let left = slot * 2 + 1;
            let right = left + 1;
            if left >= self.count {
                return;
            }
            // Prefer the left child unless the right one is strictly better.
            let mut child = left;
            if right < self.count
                && self.items[right].priority_cmp(&self.items[left]) == Ordering::Less
            {
                child = right;
            }
            if self.items[child].priority_cmp(&self.items[slot]) != Ordering::Less {
                return;
            }
            self.swap(slot, child);
            slot = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct Item {
        key: usize,
        f: i32,
        h: i32,
    }

    impl HeapItem for Item {
        fn key(&self) -> usize {
            self.key
        }
        fn priority_cmp(&self, other: &Self) -> Ordering {
            self.f.cmp(&other.f).then(self.h.cmp(&other.h))
        }
    }

    fn item(key: usize, f: i32, h: i32) -> Item {
        Item { key, f, h }
    }

    fn assert_slots_consistent(heap: &PriorityHeap<Item>) {
        for slot in 0..heap.count {
            let it = heap.items[slot];
            assert_eq!(heap.slots[it.key], slot, "slot table out of sync");
            assert!(heap.contains(&it));
        }
    }

    #[test]
    fn pops_in_f_then_h_order() {
        let mut heap = PriorityHeap::with_capacity(8);
        heap.add(item(0, 30, 10));
        heap.add(item(1, 20, 15));
        heap.add(item(2, 20, 5));
        heap.add(item(3, 40, 0));
        heap.add(item(4, 10, 10));

        let order: Vec<usize> = std::iter::from_fn(|| heap.remove_root())
            .map(|it| it.key)
            .collect();
        assert_eq!(order, vec![4, 2, 1, 0, 3]);
        assert!(heap.is_empty());
    }

    #[test]
    fn remove_root_on_empty_is_none() {
        let mut heap: PriorityHeap<Item> = PriorityHeap::with_capacity(2);
        assert_eq!(heap.remove_root(), None);
        assert_eq!(heap.peek(), None);
    }

    #[test]
    fn update_item_moves_towards_root() {
        let mut heap = PriorityHeap::with_capacity(4);
        heap.add(item(0, 10, 0));
        heap.add(item(1, 20, 0));
        heap.add(item(2, 30, 0));
        heap.update_item(item(2, 5, 0));
        assert_eq!(heap.peek().map(|it| it.key), Some(2));
        assert_eq!(heap.get(&item(2, 0, 0)).map(|it| it.f), Some(5));
        assert_slots_consistent(&heap);
    }

    #[test]
    fn contains_tracks_membership() {
        let mut heap = PriorityHeap::with_capacity(4);
        heap.add(item(0, 1, 0));
        heap.add(item(3, 2, 0));
        assert!(heap.contains(&item(0, 99, 99)));
        assert!(heap.contains(&item(3, 0, 0)));
        assert!(!heap.contains(&item(1, 0, 0)));

        heap.remove_root();
        assert!(!heap.contains(&item(0, 1, 0)));
        assert!(heap.contains(&item(3, 2, 0)));
    }

    #[test]
    fn clear_forgets_items_but_keeps_storage() {
        let mut heap = PriorityHeap::with_capacity(3);
        heap.add(item(0, 1, 0));
        heap.add(item(1, 2, 0));
        heap.clear();
        assert!(heap.is_empty());
        assert!(!heap.contains(&item(0, 0, 0)));
        assert!(!heap.contains(&item(1, 0, 0)));
        assert_eq!(heap.items.len(), 2);

        // A stale slot for key 1 must not be mistaken for the new occupant.
        heap.add(item(2, 7, 0));
        assert!(heap.contains(&item(2, 0, 0)));
        assert!(!heap.contains(&item(0, 0, 0)));
        assert!(!heap.contains(&item(1, 0, 0)));
    }

    #[test]
    #[should_panic(expected = "heap overflow")]
    fn overflow_panics() {
        let mut heap = PriorityHeap::with_capacity(1);
        heap.add(item(0, 1, 0));
        heap.add(item(0, 1, 0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(i32, i32),
        Pop,
        Improve(usize, i32),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i32..50, 0i32..20).prop_map(|(f, h)| Op::Add(f, h)),
            Just(Op::Pop),
            (0usize..32, 1i32..20).prop_map(|(k, d)| Op::Improve(k, d)),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_a_sorted_model(ops in prop::collection::vec(arb_op(), 1..120)) {
            const CAP: usize = 32;
            let mut heap = PriorityHeap::with_capacity(CAP);
            let mut model: Vec<Item> = Vec::new();
            let mut next_key = 0usize;

            for op in ops {
                match op {
                    Op::Add(f, h) => {
                        if next_key < CAP {
                            let it = item(next_key, f, h);
                            next_key += 1;
                            heap.add(it);
                            model.push(it);
                        }
                    }
                    Op::Pop => {
                        let got = heap.remove_root();
                        let best = model
                            .iter()
                            .map(|it| (it.f, it.h))
                            .min();
                        prop_assert_eq!(got.map(|it| (it.f, it.h)), best);
                        if let Some(got) = got {
                            model.retain(|it| it.key != got.key);
                            prop_assert!(!heap.contains(&got));
                        }
                    }
                    Op::Improve(k, delta) => {
                        if let Some(pos) = model.iter().position(|it| it.key == k) {
                            model[pos].f -= delta;
                            heap.update_item(model[pos]);
                        }
                    }
                }
                prop_assert_eq!(heap.len(), model.len());
                for it in &model {
                    prop_assert!(heap.contains(it));
                }
                for slot in 0..heap.count {
                    let it = heap.items[slot];
                    prop_assert_eq!(heap.slots[it.key], slot);
                }
            }
        }
    }
}
