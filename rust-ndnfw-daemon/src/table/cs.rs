//! Content Store: the in-memory Data cache.
//!
//! Entries are kept in a container sorted by canonical name order, so all
//! Data under a prefix forms a contiguous range and prefix lookup is a range
//! scan from the Interest name. Eviction order is delegated to the policy.

use crate::table::cs_policy::CsPolicy;
use log::trace;
use rust_ndnfw_common::name::Name;
use rust_ndnfw_common::packet::{Data, Interest};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug)]
pub struct CsEntry {
    pub data: Data,
    pub stale_time: Instant,
    pub is_unsolicited: bool,
}

impl CsEntry {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.stale_time
    }
}

pub struct Cs {
    entries: BTreeMap<Name, CsEntry>,
    policy: Box<dyn CsPolicy>,
}

impl Cs {
    pub fn new(policy: Box<dyn CsPolicy>) -> Self {
        Self {
            entries: BTreeMap::new(),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.policy.limit()
    }

    /// Changes the size limit; returns the number of entries evicted to get
    /// back under it.
    pub fn set_limit(&mut self, limit: usize) -> usize {
        let victims = self.policy.set_limit(limit);
        self.evict(victims)
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entry(&self, name: &Name) -> Option<&CsEntry> {
        self.entries.get(name)
    }

    /// Inserts `data`, refreshing any equal-name entry. Returns the number
    /// of entries the policy evicted as a consequence.
    pub fn insert(&mut self, data: Data, is_unsolicited: bool, now: Instant) -> usize {
        let name = data.name.clone();
        let stale_time = now + data.freshness_period();

        if let Some(entry) = self.entries.get_mut(&name) {
            entry.data = data;
            entry.stale_time = stale_time;
            // A solicited refresh upgrades an unsolicited entry.
            entry.is_unsolicited = entry.is_unsolicited && is_unsolicited;
            self.policy.do_after_refresh(&name);
            return 0;
        }

        self.entries.insert(
            name.clone(),
            CsEntry {
                data,
                stale_time,
                is_unsolicited,
            },
        );
        let victims = self.policy.do_after_insert(&name);
        self.evict(victims)
    }

    /// Looks up Data satisfying `interest`. On a hit the policy is notified
    /// so the entry counts as used.
    pub fn find(&mut self, interest: &Interest, now: Instant) -> Option<&Data> {
        let key = self.find_match(interest, now)?;
        self.policy.do_before_use(&key);
        self.entries.get(&key).map(|entry| &entry.data)
    }

    /// Erases the entry for `name` (management path, not eviction).
    pub fn erase(&mut self, name: &Name) -> bool {
        if self.entries.remove(name).is_some() {
            self.policy.do_before_erase(name);
            true
        } else {
            false
        }
    }

    fn evict(&mut self, victims: Vec<Name>) -> usize {
        let mut evicted = 0;
        for victim in victims {
            if self.entries.remove(&victim).is_some() {
                trace!("CS evict {}", victim);
                evicted += 1;
            }
        }
        evicted
    }

    fn find_match(&self, interest: &Interest, now: Instant) -> Option<Name> {
        let name = &interest.name;

        // An Interest naming a specific packet by implicit digest.
        if let Some(last) = name.get(name.len().wrapping_sub(1)) {
            if last.is_implicit_digest() {
                let base = name.prefix(name.len() - 1);
                let entry = self.entries.get(&base)?;
                if entry.data.digest().as_slice() != last.as_bytes().as_ref() {
                    return None;
                }
                if interest.must_be_fresh && !entry.is_fresh(now) {
                    return None;
                }
                return Some(base);
            }
        }

        if !interest.can_be_prefix {
            let entry = self.entries.get(name)?;
            if interest.must_be_fresh && !entry.is_fresh(now) {
                return None;
            }
            return Some(name.clone());
        }

        // Prefix match: scan the contiguous range of names under the prefix
        // and take the leftmost entry satisfying the selectors.
        for (key, entry) in self.entries.range(name.clone()..) {
            if !name.is_prefix_of(key) {
                break;
            }
            if interest.must_be_fresh && !entry.is_fresh(now) {
                continue;
            }
            return Some(key.clone());
        }
        None
    }
}

impl std::fmt::Debug for Cs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cs")
            .field("len", &self.entries.len())
            .field("policy", &self.policy.name())
            .field("limit", &self.policy.limit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::cs_policy::create_policy;
    use bytes::Bytes;
    use rust_ndnfw_common::name::NameComponent;
    use std::time::Duration;

    fn cs(limit: usize) -> Cs {
        Cs::new(create_policy("lru", limit).unwrap())
    }

    fn data(name: &str) -> Data {
        Data::new(Name::from_string(name), Bytes::from_static(b"payload"))
    }

    fn interest(name: &str) -> Interest {
        Interest::new(Name::from_string(name)).with_nonce(1)
    }

    #[test]
    fn test_exact_match() {
        let mut cs = cs(16);
        let now = Instant::now();
        cs.insert(data("/a/b"), false, now);

        assert!(cs.find(&interest("/a/b"), now).is_some());
        assert!(cs.find(&interest("/a"), now).is_none());
        assert!(cs.find(&interest("/a/b/c"), now).is_none());
    }

    #[test]
    fn test_prefix_match() {
        let mut cs = cs(16);
        let now = Instant::now();
        cs.insert(data("/a/b/1"), false, now);
        cs.insert(data("/a/b/2"), false, now);
        cs.insert(data("/a/c"), false, now);

        let hit = cs
            .find(&interest("/a/b").with_can_be_prefix(true), now)
            .unwrap();
        // Leftmost in canonical order under the prefix.
        assert_eq!(hit.name, Name::from_string("/a/b/1"));

        assert!(cs.find(&interest("/a/z").with_can_be_prefix(true), now).is_none());
    }

    #[test]
    fn test_prefix_match_includes_equal_name() {
        let mut cs = cs(16);
        let now = Instant::now();
        cs.insert(data("/a/b"), false, now);

        let hit = cs
            .find(&interest("/a/b").with_can_be_prefix(true), now)
            .unwrap();
        assert_eq!(hit.name, Name::from_string("/a/b"));
    }

    #[test]
    fn test_must_be_fresh() {
        let mut cs = cs(16);
        let t0 = Instant::now();
        cs.insert(data("/d").with_freshness_ms(100), false, t0);

        let fresh_interest = interest("/d").with_must_be_fresh(true);
        let t50 = t0 + Duration::from_millis(50);
        assert!(cs.find(&fresh_interest, t50).is_some());

        let t150 = t0 + Duration::from_millis(150);
        assert!(cs.find(&fresh_interest, t150).is_none());
        // Without MustBeFresh the stale entry still matches.
        assert!(cs.find(&interest("/d"), t150).is_some());
    }

    #[test]
    fn test_implicit_digest_match() {
        let mut cs = cs(16);
        let now = Instant::now();
        let packet = data("/a/b");
        let digest = packet.digest();
        cs.insert(packet, false, now);

        let mut by_digest = interest("/a/b");
        by_digest.name.push(NameComponent::implicit_digest(digest.to_vec()));
        assert!(cs.find(&by_digest, now).is_some());

        let mut wrong = interest("/a/b");
        wrong.name.push(NameComponent::implicit_digest(vec![0u8; 32]));
        assert!(cs.find(&wrong, now).is_none());
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut cs = cs(2);
        let now = Instant::now();

        cs.insert(data("/1"), false, now);
        cs.insert(data("/2"), false, now);
        let evicted = cs.insert(data("/3"), false, now);

        assert_eq!(evicted, 1);
        assert_eq!(cs.len(), 2);
        assert!(!cs.contains(&Name::from_string("/1")));
        assert!(cs.contains(&Name::from_string("/2")));
        assert!(cs.contains(&Name::from_string("/3")));

        // A lookup refreshes /2, so /3 becomes the eviction victim.
        assert!(cs.find(&interest("/2"), now).is_some());
        cs.insert(data("/4"), false, now);
        assert!(cs.contains(&Name::from_string("/2")));
        assert!(!cs.contains(&Name::from_string("/3")));
    }

    #[test]
    fn test_refresh_keeps_single_entry() {
        let mut cs = cs(4);
        let t0 = Instant::now();
        cs.insert(data("/a").with_freshness_ms(100), false, t0);

        let t1 = t0 + Duration::from_millis(80);
        cs.insert(data("/a").with_freshness_ms(100), false, t1);

        assert_eq!(cs.len(), 1);
        let entry = cs.entry(&Name::from_string("/a")).unwrap();
        assert_eq!(entry.stale_time, t1 + Duration::from_millis(100));
    }

    #[test]
    fn test_unsolicited_flag_upgrade() {
        let mut cs = cs(4);
        let now = Instant::now();
        cs.insert(data("/u"), true, now);
        assert!(cs.entry(&Name::from_string("/u")).unwrap().is_unsolicited);

        cs.insert(data("/u"), false, now);
        assert!(!cs.entry(&Name::from_string("/u")).unwrap().is_unsolicited);
    }

    #[test]
    fn test_set_limit_shrinks() {
        let mut cs = cs(4);
        let now = Instant::now();
        for n in ["/1", "/2", "/3", "/4"] {
            cs.insert(data(n), false, now);
        }

        assert_eq!(cs.set_limit(2), 2);
        assert_eq!(cs.len(), 2);
        assert!(cs.contains(&Name::from_string("/3")));
        assert!(cs.contains(&Name::from_string("/4")));
    }
}
