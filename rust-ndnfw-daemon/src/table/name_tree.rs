//! The name tree: one record per referenced name prefix.
//!
//! The tree is the single owner of all per-prefix state. FIB, StrategyChoice,
//! and Measurements entries live inside the record for their prefix; PIT
//! entries are owned by the PIT and referenced from the record by id. A
//! record stays alive as long as any of the four references it; once all are
//! gone, `delete_if_empty` removes the record and any ancestors that became
//! empty with it.

use crate::table::fib::FibEntry;
use crate::table::measurements::MeasurementsEntry;
use crate::table::pit::PitEntryId;
use crate::table::strategy_choice::StrategyChoiceEntry;
use rust_ndnfw_common::name::Name;
use std::collections::HashMap;

/// Default bound on the tree depth, matching the name length accepted by the
/// forwarder pipelines.
pub const DEFAULT_MAX_DEPTH: usize = rust_ndnfw_common::name::MAX_NAME_COMPONENTS;

#[derive(Debug, Default)]
pub struct NameTreeEntry {
    name: Name,
    n_children: usize,
    pub fib: Option<FibEntry>,
    pub pit_entries: Vec<PitEntryId>,
    pub strategy_choice: Option<StrategyChoiceEntry>,
    pub measurements: Option<MeasurementsEntry>,
}

impl NameTreeEntry {
    fn new(name: Name) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// True when nothing references this record and it has no children.
    pub fn is_empty(&self) -> bool {
        self.n_children == 0
            && self.fib.is_none()
            && self.pit_entries.is_empty()
            && self.strategy_choice.is_none()
            && self.measurements.is_none()
    }
}

#[derive(Debug)]
pub struct NameTree {
    entries: HashMap<Name, NameTreeEntry>,
    max_depth: usize,
}

impl NameTree {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Finds or creates the record for `name`, creating any missing ancestor
    /// records along the way. Names deeper than the depth bound are clamped
    /// to their first `max_depth` components.
    pub fn lookup(&mut self, name: &Name) -> &mut NameTreeEntry {
        let depth = name.len().min(self.max_depth);
        for len in 0..=depth {
            let prefix = name.prefix(len);
            if !self.entries.contains_key(&prefix) {
                self.entries.insert(prefix.clone(), NameTreeEntry::new(prefix.clone()));
                if len > 0 {
                    if let Some(parent) = self.entries.get_mut(&name.prefix(len - 1)) {
                        parent.n_children += 1;
                    }
                }
            }
        }
        self.entries
            .get_mut(&name.prefix(depth))
            .unwrap_or_else(|| unreachable!("record was just created"))
    }

    pub fn find_exact_match(&self, name: &Name) -> Option<&NameTreeEntry> {
        self.entries.get(name)
    }

    pub fn find_exact_match_mut(&mut self, name: &Name) -> Option<&mut NameTreeEntry> {
        self.entries.get_mut(name)
    }

    /// Walks from the longest prefix of `name` toward the root and returns
    /// the first record satisfying `predicate`.
    pub fn find_longest_prefix_match(
        &self,
        name: &Name,
        predicate: impl Fn(&NameTreeEntry) -> bool,
    ) -> Option<&NameTreeEntry> {
        let depth = name.len().min(self.max_depth);
        for len in (0..=depth).rev() {
            if let Some(entry) = self.entries.get(&name.prefix(len)) {
                if predicate(entry) {
                    return Some(entry);
                }
            }
        }
        None
    }

    /// Removes the record for `name` if nothing references it, then walks
    /// upward removing ancestors that became empty.
    pub fn delete_if_empty(&mut self, name: &Name) {
        let mut len = name.len().min(self.max_depth);
        loop {
            let prefix = name.prefix(len);
            match self.entries.get(&prefix) {
                Some(entry) if entry.is_empty() => {
                    self.entries.remove(&prefix);
                }
                _ => break,
            }
            if len == 0 {
                break;
            }
            len -= 1;
            if let Some(parent) = self.entries.get_mut(&name.prefix(len)) {
                parent.n_children -= 1;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NameTreeEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NameTreeEntry> {
        self.entries.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fib::FibEntry;

    #[test]
    fn test_lookup_creates_ancestors() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        tree.lookup(&Name::from_string("/a/b/c"));

        // Root, /a, /a/b, /a/b/c.
        assert_eq!(tree.len(), 4);
        assert!(tree.find_exact_match(&Name::from_string("/a/b")).is_some());
        assert!(tree.find_exact_match(&Name::from_string("/x")).is_none());
    }

    #[test]
    fn test_longest_prefix_match_with_predicate() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        tree.lookup(&Name::from_string("/a")).fib = Some(FibEntry::new(Name::from_string("/a")));
        tree.lookup(&Name::from_string("/a/b/c"));

        let matched = tree
            .find_longest_prefix_match(&Name::from_string("/a/b/c/d"), |e| e.fib.is_some())
            .unwrap();
        assert_eq!(matched.name(), &Name::from_string("/a"));

        assert!(tree
            .find_longest_prefix_match(&Name::from_string("/z"), |e| e.fib.is_some())
            .is_none());
    }

    #[test]
    fn test_delete_if_empty_cascades() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        tree.lookup(&Name::from_string("/a/b/c"));
        tree.lookup(&Name::from_string("/a/x")).fib = Some(FibEntry::new(Name::from_string("/a/x")));

        tree.delete_if_empty(&Name::from_string("/a/b/c"));

        // The /a/b branch is gone; /a survives because /a/x references it.
        assert!(tree.find_exact_match(&Name::from_string("/a/b/c")).is_none());
        assert!(tree.find_exact_match(&Name::from_string("/a/b")).is_none());
        assert!(tree.find_exact_match(&Name::from_string("/a")).is_some());
        assert!(tree.find_exact_match(&Name::from_string("/a/x")).is_some());
    }

    #[test]
    fn test_delete_if_empty_keeps_referenced_record() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        tree.lookup(&Name::from_string("/a")).fib = Some(FibEntry::new(Name::from_string("/a")));

        tree.delete_if_empty(&Name::from_string("/a"));
        assert!(tree.find_exact_match(&Name::from_string("/a")).is_some());
    }

    #[test]
    fn test_depth_clamp() {
        let mut tree = NameTree::new(2);
        let deep = Name::from_string("/a/b/c/d");
        let entry = tree.lookup(&deep);
        assert_eq!(entry.name(), &Name::from_string("/a/b"));
    }
}
