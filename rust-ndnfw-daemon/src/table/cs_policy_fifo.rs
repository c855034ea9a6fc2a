//! First-in-first-out eviction policy.
//!
//! Identical to LRU except that lookups and refreshes do not change an
//! entry's position; eviction order is pure insertion order.

use crate::table::cs_policy::{CsPolicy, PolicyQueue};
use rust_ndnfw_common::name::Name;

pub const POLICY_NAME: &str = "fifo";

#[derive(Debug)]
pub struct FifoPolicy {
    queue: PolicyQueue,
    limit: usize,
}

impl FifoPolicy {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: PolicyQueue::new(),
            limit,
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

impl CsPolicy for FifoPolicy {
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
        self.queue.push_back(key.clone());
        self.evict_entries()
    }

    fn do_after_refresh(&mut self, _key: &Name) {}

    fn do_before_erase(&mut self, key: &Name) {
        self.queue.remove(key);
    }

    fn do_before_use(&mut self, _key: &Name) {}
}
