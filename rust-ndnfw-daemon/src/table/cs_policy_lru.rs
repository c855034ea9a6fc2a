//! Least-recently-used eviction policy.

use crate::table::cs_policy::{CsPolicy, PolicyQueue};
use rust_ndnfw_common::name::Name;

pub const POLICY_NAME: &str = "lru";

/// Keeps entries on a queue ordered by last use; evicts from the front while
/// the store is over limit.
#[derive(Debug)]
pub struct LruPolicy {
    queue: PolicyQueue,
    limit: usize,
}

impl LruPolicy {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: PolicyQueue::new(),
            limit,
        }
    }

    fn insert_to_queue(&mut self, key: &Name) {
        // push_back only if the key is not queued yet; otherwise relocate.
        if !self.queue.push_back(key.clone()) {
            self.queue.move_to_back(key);
        }
    }

    fn evict_entries(&mut self) -> Vec<Name> {
        let mut victims = Vec::new();
        while self.queue.len() > self.limit {
            match self.queue.pop_front() {
                Some(key) => victims.push(key),
                None => break,
            }
        }
        victims
    }
}

impl CsPolicy for LruPolicy {
    fn name(&self) -> &'static str {
        POLICY_NAME
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn set_limit(&mut self, limit: usize) -> Vec<Name> {
        self.limit = limit;
        self.evict_entries()
    }

    fn do_after_insert(&mut self, key: &Name) -> Vec<Name> {
        self.insert_to_queue(key);
        self.evict_entries()
    }

    fn do_after_refresh(&mut self, key: &Name) {
        self.insert_to_queue(key);
    }

    fn do_before_erase(&mut self, key: &Name) {
        self.queue.remove(key);
    }

    fn do_before_use(&mut self, key: &Name) {
        self.insert_to_queue(key);
    }
}
