use std::collections::VecDeque;

/// Bounded list of recently observed targets, newest first.
///
/// An id that is already present is neither duplicated nor moved to the front, so
/// recency is approximate.
#[derive(Debug, Clone, Default)]
pub struct RecentHistory {
    capacity: usize,
    ids: VecDeque<u32>,
}

impl RecentHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ids: VecDeque::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, id: u32) {
        if self.capacity == 0 {
            self.ids.clear();
            return;
        }
        if self.ids.contains(&id) {
            return;
        }
        self.ids.push_front(id);
        self.ids.truncate(self.capacity);
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[allow(dead_code)]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }
}
