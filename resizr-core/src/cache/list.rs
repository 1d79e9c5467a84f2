//! Recency list backing the LRU caches
//!
//! An arena of nodes addressed by [`Handle`] instead of pointers. Slots are
//! recycled through a free list, so `push_*`, `remove` and `move_to_front` are
//! all O(1).
//!
//! The list itself does not lock: every mutation takes `&mut self`, so the
//! owner's lock (see [`super::lru::BoundedLru`]) is the single critical section
//! for a combined list + index update. `move_to_front` unlinks and relinks in
//! one call, no caller can observe the node detached.

/// Stable address of a node inside one [`OrderedList`].
///
/// A handle is only meaningful for the list that produced it and only until
/// that node is removed. Passing a foreign or stale handle is a caller bug;
/// the list does not detect it when the slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly-linked list with O(1) move-to-front.
pub struct OrderedList<T> {
    nodes: Vec<Option<Node<T>>>,
    free_list: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedList<T> {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), free_list: Vec::new(), head: None, tail: None, len: 0 }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently used node
    pub fn front(&self) -> Option<Handle> {
        self.head.map(Handle)
    }

    /// Least recently used node
    pub fn back(&self) -> Option<Handle> {
        self.tail.map(Handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.nodes.get(handle.0)?.as_ref().map(|node| &node.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.nodes.get_mut(handle.0)?.as_mut().map(|node| &mut node.value)
    }

    /// Node after `handle` (towards the back)
    pub fn next(&self, handle: Handle) -> Option<Handle> {
        self.nodes.get(handle.0)?.as_ref()?.next.map(Handle)
    }

    /// Node before `handle` (towards the front)
    pub fn prev(&self, handle: Handle) -> Option<Handle> {
        self.nodes.get(handle.0)?.as_ref()?.prev.map(Handle)
    }

    pub fn push_front(&mut self, value: T) -> Handle {
        let idx = self.allocate(value);
        self.link_front(idx);
        Handle(idx)
    }

    pub fn push_back(&mut self, value: T) -> Handle {
        let idx = self.allocate(value);
        self.link_back(idx);
        Handle(idx)
    }

    /// Unlink and return the value. An empty slot is a no-op.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.is_live(handle.0) {
            return None;
        }
        self.unlink(handle.0);
        let node = self.nodes[handle.0].take()?;
        self.free_list.push(handle.0);
        Some(node.value)
    }

    pub fn move_to_front(&mut self, handle: Handle) {
        if !self.is_live(handle.0) || self.head == Some(handle.0) {
            return;
        }
        self.unlink(handle.0);
        self.link_front(handle.0);
    }

    /// Values from front (most recent) to back
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { list: self, cursor: self.head, forward: true }
    }

    /// Values from back (least recent) to front
    pub fn iter_rev(&self) -> Iter<'_, T> {
        Iter { list: self, cursor: self.tail, forward: false }
    }

    fn is_live(&self, idx: usize) -> bool {
        matches!(self.nodes.get(idx), Some(Some(_)))
    }

    fn allocate(&mut self, value: T) -> usize {
        let node = Some(Node { value, prev: None, next: None });
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev_idx, next_idx) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev_idx {
            Some(p) => {
                if let Some(prev_node) = &mut self.nodes[p] {
                    prev_node.next = next_idx;
                }
            }
            None => self.head = next_idx,
        }

        match next_idx {
            Some(n) => {
                if let Some(next_node) = &mut self.nodes[n] {
                    next_node.prev = prev_idx;
                }
            }
            None => self.tail = prev_idx,
        }

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = None;
        }
        self.len -= 1;
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(head_node) = &mut self.nodes[h] {
                head_node.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.len += 1;
    }

    fn link_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = old_tail;
            node.next = None;
        }
        if let Some(t) = old_tail {
            if let Some(tail_node) = &mut self.nodes[t] {
                tail_node.next = Some(idx);
            }
        }
        self.tail = Some(idx);
        if self.head.is_none() {
            self.head = Some(idx);
        }
        self.len += 1;
    }
}

pub struct Iter<'a, T> {
    list: &'a OrderedList<T>,
    cursor: Option<usize>,
    forward: bool,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.list.nodes.get(idx)?.as_ref()?;
        self.cursor = if self.forward { node.next } else { node.prev };
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone>(list: &OrderedList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn test_empty_list() {
        let list: OrderedList<u32> = OrderedList::new();
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.front().is_none());
        assert!(list.back().is_none());
    }

    #[test]
    fn test_default_is_empty() {
        let list: OrderedList<u32> = OrderedList::default();
        assert!(list.is_empty());
        assert!(list.front().is_none());
    }

    #[test]
    fn test_push_front_and_back() {
        let mut list = OrderedList::new();
        list.push_front(2);
        list.push_front(1);
        list.push_back(3);

        assert_eq!(list.len(), 3);
        assert_eq!(collect(&list), vec![1, 2, 3]);
        assert_eq!(list.get(list.front().unwrap()), Some(&1));
        assert_eq!(list.get(list.back().unwrap()), Some(&3));
    }

    #[test]
    fn test_remove_middle_front_back() {
        let mut list = OrderedList::new();
        let a = list.push_back("a");
        let b = list.push_back("b");
        let c = list.push_back("c");
        let d = list.push_back("d");

        assert_eq!(list.remove(b), Some("b"));
        assert_eq!(collect(&list), vec!["a", "c", "d"]);

        assert_eq!(list.remove(a), Some("a"));
        assert_eq!(list.get(list.front().unwrap()), Some(&"c"));

        assert_eq!(list.remove(d), Some("d"));
        assert_eq!(list.get(list.back().unwrap()), Some(&"c"));

        assert_eq!(list.remove(c), Some("c"));
        assert!(list.is_empty());
        assert!(list.front().is_none() && list.back().is_none());
    }

    #[test]
    fn test_remove_twice_is_noop() {
        let mut list = OrderedList::new();
        let a = list.push_back(1);
        list.push_back(2);

        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_move_to_front() {
        let mut list = OrderedList::new();
        let a = list.push_back(1);
        let b = list.push_back(2);
        let c = list.push_back(3);

        list.move_to_front(c);
        assert_eq!(collect(&list), vec![3, 1, 2]);

        list.move_to_front(b);
        assert_eq!(collect(&list), vec![2, 3, 1]);

        // Already at front
        list.move_to_front(b);
        assert_eq!(collect(&list), vec![2, 3, 1]);
        assert_eq!(list.back(), Some(a));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = OrderedList::with_capacity(2);
        let a = list.push_back(1);
        list.remove(a);
        let b = list.push_back(2);
        assert_eq!(a, b);
        assert_eq!(collect(&list), vec![2]);
    }

    #[test]
    fn test_forward_and_reverse_walks_agree() {
        let mut list = OrderedList::new();
        let handles: Vec<_> = (0..10).map(|i| list.push_back(i)).collect();
        list.move_to_front(handles[7]);
        list.remove(handles[3]);
        list.move_to_front(handles[9]);

        let forward: Vec<_> = list.iter().copied().collect();
        let mut backward: Vec<_> = list.iter_rev().copied().collect();
        backward.reverse();

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), list.len());
        assert_eq!(forward, vec![9, 7, 0, 1, 2, 4, 5, 6, 8]);
    }

    #[test]
    fn test_next_prev_navigation() {
        let mut list = OrderedList::new();
        let a = list.push_back('a');
        let b = list.push_back('b');

        assert_eq!(list.next(a), Some(b));
        assert_eq!(list.prev(b), Some(a));
        assert_eq!(list.prev(a), None);
        assert_eq!(list.next(b), None);

        if let Some(v) = list.get_mut(a) {
            *v = 'z';
        }
        assert_eq!(list.get(a), Some(&'z'));
    }
}
