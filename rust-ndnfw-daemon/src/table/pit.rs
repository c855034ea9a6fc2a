//! Pending Interest Table.
//!
//! Entries are keyed by Interest name plus the CanBePrefix/MustBeFresh
//! selectors; Interests differing only in selectors get separate entries
//! under the same name tree record. Each entry tracks per-face in-records
//! (downstream requesters) and out-records (upstream forwards).

use crate::face::FaceId;
use crate::fw::strategy::StrategyInfo;
use crate::scheduler::EventId;
use crate::table::name_tree::NameTree;
use rust_ndnfw_common::lp::NackHeader;
use rust_ndnfw_common::name::Name;
use rust_ndnfw_common::packet::{Data, Interest};
use std::collections::HashMap;
use std::time::Instant;

/// Identifier of a PIT entry. Never reused, so a stale timer that fires
/// after its entry is gone simply fails the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitEntryId(u64);

/// Record of a downstream face the Interest arrived from.
#[derive(Debug, Clone)]
pub struct InRecord {
    pub face: FaceId,
    pub last_nonce: u32,
    pub last_renewed: Instant,
    pub expiry: Instant,
    pub interest: Interest,
}

/// Record of an upstream face the Interest was forwarded to.
#[derive(Debug, Clone)]
pub struct OutRecord {
    pub face: FaceId,
    pub last_nonce: u32,
    pub last_renewed: Instant,
    pub expiry: Instant,
    pub incoming_nack: Option<NackHeader>,
}

impl OutRecord {
    /// Accepts a Nack for this record. The Nack is accepted only when its
    /// Nonce matches the last Interest sent on this record.
    pub fn set_incoming_nack(&mut self, nonce: u32, header: NackHeader) -> bool {
        if nonce != self.last_nonce {
            return false;
        }
        self.incoming_nack = Some(header);
        true
    }

    pub fn clear_incoming_nack(&mut self) {
        self.incoming_nack = None;
    }
}

#[derive(Debug)]
pub struct PitEntry {
    id: PitEntryId,
    /// Representative Interest; refreshed to the newest one received.
    pub interest: Interest,
    in_records: Vec<InRecord>,
    out_records: Vec<OutRecord>,
    pub strategy_info: Option<StrategyInfo>,
    pub expiry_timer: Option<EventId>,
    pub straggler_timer: Option<EventId>,
    pub satisfied: bool,
}

impl PitEntry {
    fn new(id: PitEntryId, interest: Interest) -> Self {
        Self {
            id,
            interest,
            in_records: Vec::new(),
            out_records: Vec::new(),
            strategy_info: None,
            expiry_timer: None,
            straggler_timer: None,
            satisfied: false,
        }
    }

    pub fn id(&self) -> PitEntryId {
        self.id
    }

    pub fn name(&self) -> &Name {
        &self.interest.name
    }

    /// True when `interest` would aggregate into this entry.
    pub fn matches_interest(&self, interest: &Interest) -> bool {
        self.interest.name == interest.name
            && self.interest.can_be_prefix == interest.can_be_prefix
            && self.interest.must_be_fresh == interest.must_be_fresh
    }

    pub fn in_records(&self) -> &[InRecord] {
        &self.in_records
    }

    pub fn out_records(&self) -> &[OutRecord] {
        &self.out_records
    }

    pub fn in_record_of(&self, face: FaceId) -> Option<&InRecord> {
        self.in_records.iter().find(|r| r.face == face)
    }

    pub fn out_record_of(&self, face: FaceId) -> Option<&OutRecord> {
        self.out_records.iter().find(|r| r.face == face)
    }

    pub fn out_record_of_mut(&mut self, face: FaceId) -> Option<&mut OutRecord> {
        self.out_records.iter_mut().find(|r| r.face == face)
    }

    /// Locates or creates the in-record for `face` and renews it from
    /// `interest`.
    pub fn insert_or_update_in_record(
        &mut self,
        face: FaceId,
        interest: &Interest,
        now: Instant,
    ) -> &mut InRecord {
        let expiry = now + interest.lifetime();
        match self.in_records.iter().position(|r| r.face == face) {
            Some(pos) => {
                let record = &mut self.in_records[pos];
                record.last_nonce = interest.nonce;
                record.last_renewed = now;
                record.expiry = expiry;
                record.interest = interest.clone();
                record
            }
            None => {
                self.in_records.push(InRecord {
                    face,
                    last_nonce: interest.nonce,
                    last_renewed: now,
                    expiry,
                    interest: interest.clone(),
                });
                self.in_records.last_mut().unwrap_or_else(|| unreachable!())
            }
        }
    }

    /// Locates or creates the out-record for `face` and renews it from
    /// `interest`. Any previously received Nack is cleared.
    pub fn insert_or_update_out_record(
        &mut self,
        face: FaceId,
        interest: &Interest,
        now: Instant,
    ) -> &mut OutRecord {
        let expiry = now + interest.lifetime();
        match self.out_records.iter().position(|r| r.face == face) {
            Some(pos) => {
                let record = &mut self.out_records[pos];
                record.last_nonce = interest.nonce;
                record.last_renewed = now;
                record.expiry = expiry;
                record.incoming_nack = None;
                record
            }
            None => {
                self.out_records.push(OutRecord {
                    face,
                    last_nonce: interest.nonce,
                    last_renewed: now,
                    expiry,
                    incoming_nack: None,
                });
                self.out_records.last_mut().unwrap_or_else(|| unreachable!())
            }
        }
    }

    pub fn delete_in_record(&mut self, face: FaceId) {
        self.in_records.retain(|r| r.face != face);
    }

    pub fn delete_out_record(&mut self, face: FaceId) {
        self.out_records.retain(|r| r.face != face);
    }

    pub fn clear_in_records(&mut self) {
        self.in_records.clear();
    }

    pub fn has_records(&self) -> bool {
        !self.in_records.is_empty() || !self.out_records.is_empty()
    }

    pub fn has_unexpired_out_records(&self, now: Instant) -> bool {
        self.out_records.iter().any(|r| r.expiry > now)
    }

    /// True when every out-record has been answered by a Nack.
    pub fn all_out_records_nacked(&self) -> bool {
        !self.out_records.is_empty()
            && self.out_records.iter().all(|r| r.incoming_nack.is_some())
    }

    /// Loop check: the nonce was already seen on an unexpired record of a
    /// different face. Records on `ingress` itself indicate a retransmission,
    /// not a loop.
    pub fn is_duplicate_nonce(&self, nonce: u32, ingress: FaceId, now: Instant) -> bool {
        let dup_in = self
            .in_records
            .iter()
            .any(|r| r.face != ingress && r.last_nonce == nonce && r.expiry > now);
        let dup_out = self
            .out_records
            .iter()
            .any(|r| r.face != ingress && r.last_nonce == nonce && r.expiry > now);
        dup_in || dup_out
    }

    /// Whether `data` satisfies this entry. `full_name` is the Data name with
    /// the implicit digest appended, computed once per incoming packet.
    pub fn can_match_data(&self, data: &Data, full_name: &Name) -> bool {
        let name = &self.interest.name;
        if self.interest.can_be_prefix {
            name.is_prefix_of(full_name)
        } else {
            name == &data.name || name == full_name
        }
    }

    /// Deadline at which the last in-record expires.
    pub fn expiry(&self) -> Option<Instant> {
        self.in_records.iter().map(|r| r.expiry).max()
    }
}

#[derive(Debug, Default)]
pub struct Pit {
    entries: HashMap<PitEntryId, PitEntry>,
    next_id: u64,
}

impl Pit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: PitEntryId) -> Option<&PitEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: PitEntryId) -> Option<&mut PitEntry> {
        self.entries.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<PitEntryId> {
        self.entries.keys().copied().collect()
    }

    /// Finds the entry `interest` would aggregate into.
    pub fn find(&self, tree: &NameTree, interest: &Interest) -> Option<PitEntryId> {
        let record = tree.find_exact_match(&interest.name)?;
        record
            .pit_entries
            .iter()
            .copied()
            .find(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.matches_interest(interest))
            })
    }

    /// Finds or creates the entry for `interest`. Returns the id and whether
    /// the entry was created by this call.
    pub fn insert(&mut self, tree: &mut NameTree, interest: &Interest) -> (PitEntryId, bool) {
        if let Some(id) = self.find(tree, interest) {
            return (id, false);
        }

        let id = PitEntryId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, PitEntry::new(id, interest.clone()));
        tree.lookup(&interest.name).pit_entries.push(id);
        (id, true)
    }

    /// Removes the entry and its name tree back-reference. The caller is
    /// responsible for canceling any timers the entry still holds.
    pub fn erase(&mut self, tree: &mut NameTree, id: PitEntryId) -> Option<PitEntry> {
        let entry = self.entries.remove(&id)?;
        let name = entry.name().clone();
        if let Some(record) = tree.find_exact_match_mut(&name) {
            record.pit_entries.retain(|e| *e != id);
        }
        tree.delete_if_empty(&name);
        Some(entry)
    }

    /// All entries that `data` can satisfy: entries at every prefix of the
    /// Data full name, filtered by per-entry selector checks.
    pub fn find_all_data_matches(
        &self,
        tree: &NameTree,
        data: &Data,
        full_name: &Name,
    ) -> Vec<PitEntryId> {
        let mut matches = Vec::new();
        for len in 0..=full_name.len() {
            let Some(record) = tree.find_exact_match(&full_name.prefix(len)) else {
                continue;
            };
            for id in &record.pit_entries {
                if let Some(entry) = self.entries.get(id) {
                    if entry.can_match_data(data, full_name) {
                        matches.push(*id);
                    }
                }
            }
        }
        matches
    }
}
