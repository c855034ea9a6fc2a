//! Measurements table: per-prefix state kept by strategies.
//!
//! Entries live on the name tree record for their prefix and carry an expiry
//! that strategies push forward while the prefix is in active use. Expired
//! entries are swept out lazily; lookups never return them.

use crate::face::FaceId;
use crate::table::name_tree::NameTree;
use rust_ndnfw_common::name::Name;
use std::time::{Duration, Instant};

/// Baseline lifetime granted on creation and the minimum kept on extension.
pub const INITIAL_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Debug)]
pub struct MeasurementsEntry {
    pub name: Name,
    pub expiry: Instant,
    /// The upstream that most recently satisfied an Interest under this
    /// prefix, recorded by strategies that prefer a known-working nexthop.
    pub last_nexthop: Option<FaceId>,
}

#[derive(Debug, Default)]
pub struct Measurements {
    n_entries: usize,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.n_entries
    }

    /// Finds or creates the entry for `name`.
    pub fn get<'a>(
        &mut self,
        tree: &'a mut NameTree,
        name: &Name,
        now: Instant,
    ) -> &'a mut MeasurementsEntry {
        let record = tree.lookup(name);
        let entry_name = record.name().clone();
        if record.measurements.is_none() {
            record.measurements = Some(MeasurementsEntry {
                name: entry_name,
                expiry: now + INITIAL_LIFETIME,
                last_nexthop: None,
            });
            self.n_entries += 1;
        }
        record
            .measurements
            .as_mut()
            .unwrap_or_else(|| unreachable!("entry was just created"))
    }

    /// Ensures the entry for `name` lives at least `lifetime` from `now`.
    pub fn extend_lifetime(
        &mut self,
        tree: &mut NameTree,
        name: &Name,
        lifetime: Duration,
        now: Instant,
    ) {
        let entry = self.get(tree, name, now);
        let expiry = now + lifetime;
        if expiry > entry.expiry {
            entry.expiry = expiry;
        }
    }

    /// Longest-prefix lookup over unexpired entries.
    pub fn find_longest_prefix_match<'a>(
        &self,
        tree: &'a NameTree,
        name: &Name,
        now: Instant,
    ) -> Option<&'a MeasurementsEntry> {
        tree.find_longest_prefix_match(name, |record| {
            record.measurements.as_ref().is_some_and(|m| m.expiry > now)
        })
        .and_then(|record| record.measurements.as_ref())
    }

    /// Drops expired entries and garbage-collects their records.
    pub fn sweep(&mut self, tree: &mut NameTree, now: Instant) {
        let expired: Vec<Name> = tree
            .iter()
            .filter(|record| {
                record.measurements.as_ref().is_some_and(|m| m.expiry <= now)
            })
            .map(|record| record.name().clone())
            .collect();

        for name in expired {
            if let Some(record) = tree.find_exact_match_mut(&name) {
                record.measurements = None;
                self.n_entries -= 1;
            }
            tree.delete_if_empty(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::name_tree::DEFAULT_MAX_DEPTH;

    #[test]
    fn test_extend_lifetime_only_forward() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut measurements = Measurements::new();
        let now = Instant::now();
        let name = Name::from_string("/a");

        measurements.extend_lifetime(&mut tree, &name, Duration::from_secs(8), now);
        let expiry = measurements
            .find_longest_prefix_match(&tree, &name, now)
            .unwrap()
            .expiry;
        assert_eq!(expiry, now + Duration::from_secs(8));

        // A shorter extension never pulls the expiry back.
        measurements.extend_lifetime(&mut tree, &name, Duration::from_secs(1), now);
        let entry = measurements
            .find_longest_prefix_match(&tree, &name, now)
            .unwrap();
        assert_eq!(entry.expiry, now + Duration::from_secs(8));
    }

    #[test]
    fn test_expired_entries_are_invisible_and_swept() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut measurements = Measurements::new();
        let now = Instant::now();
        let name = Name::from_string("/a/b");

        measurements.get(&mut tree, &name, now);
        assert_eq!(measurements.len(), 1);

        let later = now + INITIAL_LIFETIME + Duration::from_secs(1);
        assert!(measurements
            .find_longest_prefix_match(&tree, &name, later)
            .is_none());

        measurements.sweep(&mut tree, later);
        assert_eq!(measurements.len(), 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_lpm_over_prefixes() {
        let mut tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut measurements = Measurements::new();
        let now = Instant::now();

        measurements.get(&mut tree, &Name::from_string("/a"), now).last_nexthop =
            Some(FaceId::new(7));

        let entry = measurements
            .find_longest_prefix_match(&tree, &Name::from_string("/a/b/c"), now)
            .unwrap();
        assert_eq!(entry.name, Name::from_string("/a"));
        assert_eq!(entry.last_nexthop, Some(FaceId::new(7)));
    }
}
