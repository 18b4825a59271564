use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// FIFO queue that refuses an element while an equal one is still queued.
///
/// The backing set mirrors the queue contents exactly, so membership tests
/// and `pull` stay O(1) amortized. Once an element has been pulled it may be
/// added again.
#[derive(Debug, Clone)]
pub struct UniqueQueue<T> {
    queue: VecDeque<T>,
    queued: HashSet<T>,
}

impl<T> Default for UniqueQueue<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> UniqueQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` at the tail. Returns `false` and leaves the queue
    /// untouched if an equal item is already queued.
    pub fn add(&mut self, item: T) -> bool {
        if !self.queued.insert(item.clone()) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Remove and return the head of the queue.
    pub fn pull(&mut self) -> Option<T> {
        let item = self.queue.pop_front()?;
        self.queued.remove(&item);
        Some(item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.queue.front()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.queued.contains(item)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    /// Iterate over queued items from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }
}

impl<T: Eq + Hash + Clone> Extend<T> for UniqueQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for UniqueQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_queued_duplicates() {
        let mut queue = UniqueQueue::new();

        assert!(queue.add("a"));
        assert!(queue.add("b"));
        assert!(!queue.add("a"));

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pull_follows_first_add_order() {
        let mut queue: UniqueQueue<i32> = [3, 1, 3, 2, 1].into_iter().collect();

        assert_eq!(queue.pull(), Some(3));
        assert_eq!(queue.pull(), Some(1));
        assert_eq!(queue.pull(), Some(2));
        assert_eq!(queue.pull(), None);
    }

    #[test]
    fn test_pulled_item_can_be_added_again() {
        let mut queue = UniqueQueue::new();
        queue.add(7);

        assert_eq!(queue.pull(), Some(7));
        assert!(queue.add(7));
        assert!(queue.contains(&7));
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue = UniqueQueue::new();
        assert_eq!(queue.peek(), None);

        queue.add("head");
        queue.add("tail");

        assert_eq!(queue.peek(), Some(&"head"));
        assert_eq!(queue.len(), 2);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_no_duplicates_among_queued_items() {
        let mut queue = UniqueQueue::new();
        for value in [5, 4, 5, 4, 3, 5, 2] {
            queue.add(value);
        }
        queue.pull();
        queue.add(5);

        let items: Vec<_> = queue.iter().copied().collect();
        let unique: HashSet<_> = items.iter().copied().collect();
        assert_eq!(items.len(), unique.len());
        assert_eq!(items, vec![4, 3, 2, 5]);
    }

    #[test]
    fn test_clear_empties_both_sides() {
        let mut queue: UniqueQueue<&str> = ["x", "y"].into_iter().collect();
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.add("x"));
    }
}
