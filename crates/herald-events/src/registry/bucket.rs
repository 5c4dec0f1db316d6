//! Per-key ordered listener storage

use crate::listener::Listener;

use super::ListenerDescriptor;

#[derive(Debug, Clone)]
struct Entry {
    descriptor: ListenerDescriptor,
    listener: Listener,
}

/// Listeners for one event key, ordered by priority descending.
///
/// Equal priorities keep registration order.
#[derive(Debug, Clone, Default)]
pub struct PriorityBucket {
    entries: Vec<Entry>,
}

impl PriorityBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every entry with a priority greater than or equal to the new one
    pub(crate) fn insert(&mut self, descriptor: ListenerDescriptor, listener: Listener) {
        let priority = descriptor.priority();
        let at = self
            .entries
            .partition_point(|entry| entry.descriptor.priority() >= priority);
        self.entries.insert(at, Entry { descriptor, listener });
    }

    pub fn listeners(&self) -> impl Iterator<Item = &Listener> + '_ {
        self.entries.iter().map(|entry| &entry.listener)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ListenerDescriptor> + '_ {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(bucket: &mut PriorityBucket, name: &'static str, priority: i32) {
        let listener = Listener::new(|_| Ok(())).with_name(name);
        let descriptor = ListenerDescriptor::callable("key", listener.clone(), priority);
        bucket.insert(descriptor, listener);
    }

    fn names(bucket: &PriorityBucket) -> Vec<&str> {
        bucket.listeners().map(Listener::name).collect()
    }

    #[test]
    fn test_orders_by_priority_descending() {
        let mut bucket = PriorityBucket::new();
        insert(&mut bucket, "a", 10);
        insert(&mut bucket, "b", 20);
        insert(&mut bucket, "c", 5);

        assert_eq!(names(&bucket), ["b", "a", "c"]);
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let mut bucket = PriorityBucket::new();
        insert(&mut bucket, "first", 0);
        insert(&mut bucket, "high", 1);
        insert(&mut bucket, "second", 0);
        insert(&mut bucket, "low", -1);
        insert(&mut bucket, "third", 0);

        assert_eq!(names(&bucket), ["high", "first", "second", "third", "low"]);
        assert_eq!(bucket.len(), 5);
    }

    #[test]
    fn test_descriptors_follow_listener_order() {
        let mut bucket = PriorityBucket::new();
        insert(&mut bucket, "a", 1);
        insert(&mut bucket, "b", 3);

        let priorities: Vec<i32> = bucket.descriptors().map(ListenerDescriptor::priority).collect();
        assert_eq!(priorities, [3, 1]);
    }
}
