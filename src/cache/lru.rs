//! Recency List Module
//!
//! Slot-indexed doubly linked list that keeps items in recency order.

// == Slot Index ==
/// Stable position of an item inside a [`RecencyList`].
///
/// An index stays valid until its item is removed; afterwards the slot may be
/// recycled for a different item.
pub type SlotId = usize;

#[derive(Debug)]
struct Node<T> {
    item: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

// == Recency List ==
/// Tracks access order for LRU eviction strategy.
///
/// Items live in an arena of slots linked by index where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Freed slots are kept on a free list and reused by later inserts, so every
/// operation is O(1) apart from iteration.
#[derive(Debug)]
pub struct RecencyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<SlotId>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts an item as the most recently used and returns its slot.
    pub fn push_front(&mut self, item: T) -> SlotId {
        let node = Node {
            item,
            prev: None,
            next: self.head,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.set_prev(old_head, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    // == Touch ==
    /// Marks a slot as recently used (moves it to the front).
    pub fn move_to_front(&mut self, id: SlotId) {
        if self.head == Some(id) || self.get(id).is_none() {
            return;
        }
        self.unlink(id);
        let old_head = self.head;
        self.set_next(id, old_head);
        match old_head {
            Some(old_head) => self.set_prev(old_head, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    // == Remove ==
    /// Removes the item in `id` and returns it, recycling the slot.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.slots.get(id)?.as_ref()?;
        self.unlink(id);
        let node = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        self.len -= 1;
        Some(node.item)
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used item.
    ///
    /// Returns None if the list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Peek Oldest ==
    /// Returns the slot of the least recently used item without removing it.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id)?.as_ref().map(|node| &node.item)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id)?.as_mut().map(|node| &mut node.item)
    }

    /// Slot that follows `id` towards the back of the list.
    pub fn next_of(&self, id: SlotId) -> Option<SlotId> {
        self.slots.get(id)?.as_ref()?.next
    }

    // == Length ==
    /// Returns the number of tracked items.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every item and releases the arena.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates items from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    // Detaches `id` from its neighbours, leaving its own links cleared.
    fn unlink(&mut self, id: SlotId) {
        let Some(Some(node)) = self.slots.get_mut(id) else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());
        match prev {
            Some(prev) => self.set_next(prev, next),
            None => self.head = next,
        }
        match next {
            Some(next) => self.set_prev(next, prev),
            None => self.tail = prev,
        }
    }

    fn set_prev(&mut self, id: SlotId, prev: Option<SlotId>) {
        if let Some(Some(node)) = self.slots.get_mut(id) {
            node.prev = prev;
        }
    }

    fn set_next(&mut self, id: SlotId, next: Option<SlotId>) {
        if let Some(Some(node)) = self.slots.get_mut(id) {
            node.next = next;
        }
    }
}

// == Iterator ==
/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.slots.get(id)?.as_ref()?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RecencyList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
