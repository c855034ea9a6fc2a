//! Forwarding Information Base.
//!
//! Maps name prefixes to nexthop sets. Entry state lives on the name tree
//! record for the prefix; this table tracks the entry count and implements
//! the operations over the tree.

use crate::face::FaceId;
use crate::table::name_tree::NameTree;
use rust_ndnfw_common::name::Name;

/// A single nexthop of a FIB entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHop {
    pub face: FaceId,
    pub cost: u64,
}

#[derive(Debug)]
pub struct FibEntry {
    prefix: Name,
    // Sorted ascending by (cost, face); no duplicate face.
    nexthops: Vec<NextHop>,
}

impl FibEntry {
    pub fn new(prefix: Name) -> Self {
        Self {
            prefix,
            nexthops: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    pub fn nexthops(&self) -> &[NextHop] {
        &self.nexthops
    }

    pub fn has_nexthops(&self) -> bool {
        !self.nexthops.is_empty()
    }

    pub fn nexthop_of(&self, face: FaceId) -> Option<&NextHop> {
        self.nexthops.iter().find(|nh| nh.face == face)
    }

    /// Adds or updates the nexthop for `face`. Returns true when the face was
    /// not previously a nexthop of this entry.
    pub fn add_or_update_nexthop(&mut self, face: FaceId, cost: u64) -> bool {
        let is_new = match self.nexthops.iter_mut().find(|nh| nh.face == face) {
            Some(nexthop) => {
                nexthop.cost = cost;
                false
            }
            None => {
                self.nexthops.push(NextHop { face, cost });
                true
            }
        };
        self.nexthops.sort_by_key(|nh| (nh.cost, nh.face));
        is_new
    }

    pub fn remove_nexthop(&mut self, face: FaceId) -> bool {
        let before = self.nexthops.len();
        self.nexthops.retain(|nh| nh.face != face);
        self.nexthops.len() != before
    }
}

#[derive(Debug, Default)]
pub struct Fib {
    n_entries: usize,
}

impl Fib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.n_entries
    }

    pub fn is_empty(&self) -> bool {
        self.n_entries == 0
    }

    /// Finds or creates the entry for `prefix`. Returns true when the entry
    /// was created by this call.
    pub fn insert(&mut self, tree: &mut NameTree, prefix: &Name) -> bool {
        let record = tree.lookup(prefix);
        if record.fib.is_some() {
            return false;
        }
        record.fib = Some(FibEntry::new(record.name().clone()));
        self.n_entries += 1;
        true
    }

    /// Inserts the entry if needed and adds or updates the nexthop. Returns
    /// true when `face` became a new nexthop of the entry.
    pub fn add_or_update_nexthop(
        &mut self,
        tree: &mut NameTree,
        prefix: &Name,
        face: FaceId,
        cost: u64,
    ) -> bool {
        self.insert(tree, prefix);
        let record = tree.lookup(prefix);
        match record.fib.as_mut() {
            Some(entry) => entry.add_or_update_nexthop(face, cost),
            None => false,
        }
    }

    /// Removes the nexthop for `face`; erases the entry once it has no
    /// nexthops left.
    pub fn remove_nexthop(&mut self, tree: &mut NameTree, prefix: &Name, face: FaceId) {
        let mut erase = false;
        if let Some(record) = tree.find_exact_match_mut(prefix) {
            if let Some(entry) = record.fib.as_mut() {
                entry.remove_nexthop(face);
                erase = !entry.has_nexthops();
            }
        }
        if erase {
            self.erase(tree, prefix);
        }
    }

    pub fn erase(&mut self, tree: &mut NameTree, prefix: &Name) {
        if let Some(record) = tree.find_exact_match_mut(prefix) {
            if record.fib.take().is_some() {
                self.n_entries -= 1;
            }
        }
        tree.delete_if_empty(prefix);
    }

    pub fn find_exact_match<'a>(&self, tree: &'a NameTree, prefix: &Name) -> Option<&'a FibEntry> {
        tree.find_exact_match(prefix).and_then(|r| r.fib.as_ref())
    }

    /// Longest-prefix lookup, skipping entries without nexthops.
    pub fn find_longest_prefix_match<'a>(
        &self,
        tree: &'a NameTree,
        name: &Name,
    ) -> Option<&'a FibEntry> {
        tree.find_longest_prefix_match(name, |record| {
            record.fib.as_ref().is_some_and(|e| e.has_nexthops())
        })
        .and_then(|record| record.fib.as_ref())
    }

    /// Drops `face` from every entry; entries left without nexthops are
    /// erased. Called when a face is closed.
    pub fn remove_face(&mut self, tree: &mut NameTree, face: FaceId) {
        let affected: Vec<Name> = tree
            .iter()
            .filter(|record| {
                record
                    .fib
                    .as_ref()
                    .is_some_and(|e| e.nexthop_of(face).is_some())
            })
            .map(|record| record.name().clone())
            .collect();

        for prefix in affected {
            self.remove_nexthop(tree, &prefix, face);
        }
    }
}
