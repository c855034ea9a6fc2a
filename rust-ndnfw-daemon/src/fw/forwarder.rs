//! The forwarder: owns all tables and runs the packet pipelines.
//!
//! Everything here executes on the forwarder thread. A pipeline runs to
//! completion without suspension; deferred work (PIT expiry, straggler
//! cleanup, reassembly drops) goes through the scheduler and is handled as a
//! separate turn by `handle_timer`.

use crate::clock::Clock;
use crate::config::{ForwarderConfig, UnsolicitedDataPolicy};
use crate::face::link_service::{LinkService, LinkServiceOptions};
use crate::face::lp_reassembler::{EndpointId, LpReassemblerOptions};
use crate::face::transport::Transport;
use crate::face::{FaceId, FaceScope, FaceTable, RxPacket};
use crate::fw::best_route::BestRouteStrategy;
use crate::fw::strategy::{create_strategy, Strategy};
use crate::scheduler::{Scheduler, TimerEvent};
use crate::table::cs::Cs;
use crate::table::cs_policy::create_policy;
use crate::table::cs_policy_lru::LruPolicy;
use crate::table::fib::{Fib, NextHop};
use crate::table::measurements::Measurements;
use crate::table::name_tree::{NameTree, DEFAULT_MAX_DEPTH};
use crate::table::pit::{Pit, PitEntryId};
use crate::table::strategy_choice::StrategyChoice;
use log::{debug, trace, warn};
use rust_ndnfw_common::lp::NackHeader;
use rust_ndnfw_common::metrics::ForwarderMetrics;
use rust_ndnfw_common::name::{Name, MAX_NAME_COMPONENTS};
use rust_ndnfw_common::packet::{Data, Interest, Nack, NackReason};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Forwarder {
    config: ForwarderConfig,
    unsolicited_policy: UnsolicitedDataPolicy,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler<TimerEvent>,
    faces: FaceTable,
    name_tree: NameTree,
    fib: Fib,
    pit: Pit,
    cs: Cs,
    strategy_choice: StrategyChoice,
    measurements: Measurements,
    metrics: ForwarderMetrics,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig, clock: Arc<dyn Clock>) -> Self {
        let policy = create_policy(&config.cs_policy, config.cs_max_packets).unwrap_or_else(|| {
            warn!("unknown CS policy {:?}, using lru", config.cs_policy);
            Box::new(LruPolicy::new(config.cs_max_packets))
        });

        let default_strategy_name = Name::from_string(&config.strategy_choice_default);
        let default_strategy: Arc<dyn Strategy> = create_strategy(&default_strategy_name)
            .unwrap_or_else(|| {
                warn!(
                    "unknown default strategy {}, using best-route",
                    default_strategy_name
                );
                Arc::new(BestRouteStrategy::new())
            });

        let unsolicited_policy = config.unsolicited_data_policy();
        let mut name_tree = NameTree::new(DEFAULT_MAX_DEPTH);
        let mut strategy_choice = StrategyChoice::new();
        strategy_choice.insert(&mut name_tree, Name::new(), default_strategy);

        Self {
            config,
            unsolicited_policy,
            clock,
            scheduler: Scheduler::new(),
            faces: FaceTable::new(),
            name_tree,
            fib: Fib::new(),
            pit: Pit::new(),
            cs: Cs::new(policy),
            strategy_choice,
            measurements: Measurements::new(),
            metrics: ForwarderMetrics::new(),
        }
    }

    /* ------------------------------------------------------------ *
     * Accessors
     * ------------------------------------------------------------ */

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn clock_now(&self) -> Instant {
        self.clock.now()
    }

    pub fn metrics(&self) -> &ForwarderMetrics {
        &self.metrics
    }

    pub fn faces(&self) -> &FaceTable {
        &self.faces
    }

    pub fn faces_mut(&mut self) -> &mut FaceTable {
        &mut self.faces
    }

    pub fn name_tree(&self) -> &NameTree {
        &self.name_tree
    }

    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    pub(crate) fn pit_mut(&mut self) -> &mut Pit {
        &mut self.pit
    }

    pub fn cs(&self) -> &Cs {
        &self.cs
    }

    pub fn cs_mut(&mut self) -> &mut Cs {
        &mut self.cs
    }

    pub fn strategy_choice(&self) -> &StrategyChoice {
        &self.strategy_choice
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    /* ------------------------------------------------------------ *
     * Face management
     * ------------------------------------------------------------ */

    /// Registers a face around `transport`, configured from the forwarder
    /// options.
    pub fn add_face(&mut self, scope: FaceScope, transport: Box<dyn Transport>) -> FaceId {
        let options = LinkServiceOptions {
            congestion_threshold: self.config.congestion_threshold,
            reassembler: LpReassemblerOptions {
                n_max_fragments: self.config.reassembly_max_fragments,
                reassembly_timeout: self.config.reassembly_timeout(),
            },
        };
        self.faces.add(scope, LinkService::new(options), transport)
    }

    /// Gracefully closes a face and purges it from FIB and PIT.
    pub fn remove_face(&mut self, id: FaceId) {
        if let Some(mut face) = self.faces.remove(id) {
            face.close();
        }
        self.purge_face(id);
    }

    /// Handles a fatal transport error reported for `id`.
    pub fn on_transport_failure(&mut self, id: FaceId) {
        warn!("[face {}] transport failure, closing", id);
        if let Some(mut face) = self.faces.remove(id) {
            face.fail();
        }
        self.purge_face(id);
    }

    fn purge_face(&mut self, face: FaceId) {
        self.fib.remove_face(&mut self.name_tree, face);
        for id in self.pit.ids() {
            let now_empty = {
                let Some(entry) = self.pit.get_mut(id) else {
                    continue;
                };
                entry.delete_in_record(face);
                entry.delete_out_record(face);
                !entry.has_records()
            };
            if now_empty {
                self.erase_pit_entry(id);
            }
        }
    }

    /* ------------------------------------------------------------ *
     * Routing and strategy management
     * ------------------------------------------------------------ */

    /// Adds or updates a route. A newly added nexthop is offered to the
    /// strategies of all still-pending PIT entries under the prefix.
    pub fn add_route(&mut self, prefix: &Name, face: FaceId, cost: u64) {
        let is_new = self
            .fib
            .add_or_update_nexthop(&mut self.name_tree, prefix, face, cost);
        if !is_new {
            return;
        }
        debug!("route added: {} -> face {} cost {}", prefix, face, cost);

        let nexthop = NextHop { face, cost };
        let pending: Vec<(PitEntryId, Name)> = self
            .pit
            .ids()
            .into_iter()
            .filter_map(|id| {
                let entry = self.pit.get(id)?;
                (!entry.satisfied && prefix.is_prefix_of(entry.name()))
                    .then(|| (id, entry.name().clone()))
            })
            .collect();
        for (id, name) in pending {
            if let Some(strategy) = self
                .strategy_choice
                .find_effective_strategy(&self.name_tree, &name)
            {
                strategy.after_new_nexthop(self, nexthop, id);
            }
        }
    }

    pub fn remove_route(&mut self, prefix: &Name, face: FaceId) {
        self.fib.remove_nexthop(&mut self.name_tree, prefix, face);
    }

    /// Sets the strategy for `prefix` by registered name.
    pub fn set_strategy(&mut self, prefix: Name, strategy_name: &Name) -> bool {
        match create_strategy(strategy_name) {
            Some(strategy) => {
                self.strategy_choice
                    .insert(&mut self.name_tree, prefix, strategy);
                true
            }
            None => {
                warn!("unknown strategy {}", strategy_name);
                false
            }
        }
    }

    /* ------------------------------------------------------------ *
     * Ingress
     * ------------------------------------------------------------ */

    /// Entry point for a link packet received on `face_id`. Decodes,
    /// reassembles, and dispatches into the matching pipeline.
    pub fn on_receive(&mut self, face_id: FaceId, endpoint: EndpointId, wire: &[u8]) {
        let now = self.clock.now();
        let packet = {
            let Self {
                faces, scheduler, ..
            } = self;
            let Some(face) = faces.get_mut(face_id) else {
                trace!("packet for unknown face {}", face_id);
                return;
            };
            face.receive(scheduler, now, endpoint, wire)
        };

        match packet {
            Some(RxPacket::Interest(interest)) => self.on_interest(face_id, interest),
            Some(RxPacket::Data(data)) => self.on_data(face_id, data),
            Some(RxPacket::Nack(nack)) => self.on_nack(face_id, nack),
            None => {}
        }
    }

    /* ------------------------------------------------------------ *
     * Incoming Interest pipeline
     * ------------------------------------------------------------ */

    pub fn on_interest(&mut self, ingress: FaceId, mut interest: Interest) {
        self.metrics.interests_received.increment();
        trace!("[face {}] incoming Interest {}", ingress, interest.name);

        if let Some(hop_limit) = interest.hop_limit {
            if hop_limit == 0 {
                warn!("[face {}] Interest {} hop limit exhausted", ingress, interest.name);
                self.metrics.dropped_policy.increment();
                return;
            }
            interest.hop_limit = Some(hop_limit - 1);
        }

        if interest.name.is_empty() || interest.name.len() > MAX_NAME_COMPONENTS {
            warn!("[face {}] Interest name length out of bounds", ingress);
            self.metrics.dropped_policy.increment();
            return;
        }

        let now = self.clock.now();

        // Loop detection by nonce against existing PIT records.
        if let Some(id) = self.pit.find(&self.name_tree, &interest) {
            let looped = self
                .pit
                .get(id)
                .is_some_and(|e| e.is_duplicate_nonce(interest.nonce, ingress, now));
            if looped {
                debug!(
                    "[face {}] looped Interest {} nonce {:08x}",
                    ingress, interest.name, interest.nonce
                );
                self.metrics.loops_detected.increment();
                self.transmit_nack(ingress, &interest, NackReason::Duplicate);
                return;
            }
        }

        // Content store lookup.
        if let Some(data) = self.cs.find(&interest, now).cloned() {
            trace!("[face {}] CS hit for {}", ingress, interest.name);
            self.metrics.cs_hits.increment();
            self.send_data_to(ingress, &data);
            if let Some(strategy) = self
                .strategy_choice
                .find_effective_strategy(&self.name_tree, &interest.name)
            {
                strategy.after_content_store_hit(self, &interest, ingress, &data);
            }
            return;
        }
        self.metrics.cs_misses.increment();

        // Find or create the PIT entry and renew the downstream record.
        let (id, is_new) = self.pit.insert(&mut self.name_tree, &interest);
        if is_new {
            self.metrics.pit_inserts.increment();
        }
        if let Some(entry) = self.pit.get_mut(id) {
            entry.insert_or_update_in_record(ingress, &interest, now);
            entry.interest = interest.clone();
        }
        self.metrics.pit_size.set(self.pit.len() as u64);
        self.reset_pit_expiry(id);

        let Some(strategy) = self
            .strategy_choice
            .find_effective_strategy(&self.name_tree, &interest.name)
        else {
            warn!("no strategy for {}", interest.name);
            return;
        };
        strategy.after_receive_interest(self, &interest, ingress, id);
    }

    /* ------------------------------------------------------------ *
     * Incoming Data pipeline
     * ------------------------------------------------------------ */

    pub fn on_data(&mut self, ingress: FaceId, data: Data) {
        self.metrics.data_received.increment();
        trace!("[face {}] incoming Data {}", ingress, data.name);

        let now = self.clock.now();
        let full_name = data.full_name();
        let matches = self.pit.find_all_data_matches(&self.name_tree, &data, &full_name);

        if matches.is_empty() {
            match self.unsolicited_policy {
                UnsolicitedDataPolicy::DropAll => {
                    trace!("[face {}] unsolicited Data {} dropped", ingress, data.name);
                }
                UnsolicitedDataPolicy::AdmitAll => {
                    self.insert_into_cs(data, true, now);
                }
            }
            return;
        }

        for id in matches {
            let Some(entry) = self.pit.get(id) else {
                continue;
            };
            let entry_name = entry.name().clone();
            if let Some(strategy) = self
                .strategy_choice
                .find_effective_strategy(&self.name_tree, &entry_name)
            {
                strategy.before_satisfy_interest(self, id, ingress, &data);
            }

            let Some((downstreams, old_timer, was_satisfied)) = ({
                self.pit.get_mut(id).map(|entry| {
                    let downstreams: Vec<FaceId> = entry
                        .in_records()
                        .iter()
                        .filter(|r| r.expiry > now && r.face != ingress)
                        .map(|r| r.face)
                        .collect();
                    let old_timer = entry.expiry_timer.take();
                    let was_satisfied = entry.satisfied;
                    entry.satisfied = true;
                    entry.clear_in_records();
                    (downstreams, old_timer, was_satisfied)
                })
            }) else {
                continue;
            };

            if let Some(timer) = old_timer {
                self.scheduler.cancel(timer);
            }
            // Hold the satisfied entry briefly so strategies can observe
            // duplicate or straggler Data.
            if !was_satisfied {
                let timer = self.scheduler.schedule(
                    now + self.config.pit_straggler_timeout(),
                    TimerEvent::PitStraggler(id),
                );
                if let Some(entry) = self.pit.get_mut(id) {
                    entry.straggler_timer = Some(timer);
                }
            }

            for face in downstreams {
                self.metrics.interests_satisfied.increment();
                self.send_data_to(face, &data);
            }
        }

        self.insert_into_cs(data, false, now);
    }

    /* ------------------------------------------------------------ *
     * Incoming Nack pipeline
     * ------------------------------------------------------------ */

    pub fn on_nack(&mut self, ingress: FaceId, nack: Nack) {
        self.metrics.nacks_received.increment();
        trace!(
            "[face {}] incoming Nack {} {}",
            ingress,
            nack.reason,
            nack.interest.name
        );

        let Some(id) = self.pit.find(&self.name_tree, &nack.interest) else {
            trace!("Nack without matching PIT entry, dropped");
            return;
        };

        let accepted = {
            let Some(entry) = self.pit.get_mut(id) else {
                return;
            };
            match entry.out_record_of_mut(ingress) {
                Some(record) => {
                    record.set_incoming_nack(nack.interest.nonce, NackHeader::new(nack.reason))
                }
                None => false,
            }
        };
        if !accepted {
            trace!("Nack nonce does not match out-record, dropped");
            return;
        }

        let Some(strategy) = self
            .strategy_choice
            .find_effective_strategy(&self.name_tree, &nack.interest.name)
        else {
            return;
        };
        strategy.after_receive_nack(self, &nack, ingress, id);
    }

    /* ------------------------------------------------------------ *
     * Egress (strategy callbacks)
     * ------------------------------------------------------------ */

    /// Forwards the entry's Interest to `egress`, writing the out-record.
    pub fn send_interest(&mut self, id: PitEntryId, egress: FaceId) {
        let now = self.clock.now();
        let interest = {
            let Some(entry) = self.pit.get_mut(id) else {
                return;
            };
            let interest = entry.interest.clone();
            entry.insert_or_update_out_record(egress, &interest, now);
            interest
        };

        self.metrics.interests_forwarded.increment();
        let Some(face) = self.faces.get_mut(egress) else {
            debug!("send Interest to unknown face {}", egress);
            return;
        };
        if !face.is_up() {
            debug!("[face {}] not up, Interest {} not sent", egress, interest.name);
            return;
        }
        if let Err(e) = face.send_interest(&interest) {
            warn!("[face {}] send Interest failed: {}", egress, e);
        }
    }

    /// Sends a Nack to every downstream of the entry and drops the
    /// in-records.
    pub fn send_nacks(&mut self, id: PitEntryId, reason: NackReason) {
        let downstreams: Vec<(FaceId, Interest)> = {
            let Some(entry) = self.pit.get_mut(id) else {
                return;
            };
            let downstreams = entry
                .in_records()
                .iter()
                .map(|r| (r.face, r.interest.clone()))
                .collect();
            entry.clear_in_records();
            downstreams
        };

        for (face, interest) in downstreams {
            self.transmit_nack(face, &interest, reason);
        }
    }

    /// Erases a PIT entry, canceling its timers.
    pub fn erase_pit_entry(&mut self, id: PitEntryId) {
        if let Some(entry) = self.pit.get_mut(id) {
            let timers = [entry.expiry_timer.take(), entry.straggler_timer.take()];
            for timer in timers.into_iter().flatten() {
                self.scheduler.cancel(timer);
            }
        }
        self.pit.erase(&mut self.name_tree, id);
        self.metrics.pit_size.set(self.pit.len() as u64);
    }

    /* ------------------------------------------------------------ *
     * Strategy helpers
     * ------------------------------------------------------------ */

    /// Nexthops for an Interest: by forwarding hint when present and the
    /// ingress is non-local, else by longest prefix match on the name.
    pub fn lookup_nexthops(&self, interest: &Interest, ingress: FaceId) -> Vec<NextHop> {
        let use_hint = !interest.forwarding_hint.is_empty()
            && self
                .faces
                .get(ingress)
                .map_or(true, |f| f.scope() == FaceScope::NonLocal);
        let name = if use_hint {
            &interest.forwarding_hint[0]
        } else {
            &interest.name
        };
        self.fib
            .find_longest_prefix_match(&self.name_tree, name)
            .map(|entry| entry.nexthops().to_vec())
            .unwrap_or_default()
    }

    /// A face is an eligible upstream when it exists, is up, and is not the
    /// face the Interest came from.
    pub fn is_eligible_nexthop(&self, face: FaceId, ingress: FaceId) -> bool {
        face != ingress && self.faces.get(face).is_some_and(|f| f.is_up())
    }

    /// Remembers `face` as a working upstream for `name`.
    pub fn record_working_nexthop(&mut self, name: &Name, face: FaceId, lifetime: Duration) {
        let now = self.clock.now();
        let entry = self.measurements.get(&mut self.name_tree, name, now);
        entry.last_nexthop = Some(face);
        let expiry = now + lifetime;
        if expiry > entry.expiry {
            entry.expiry = expiry;
        }
    }

    /// The remembered working upstream for `name`, if still fresh.
    pub fn preferred_nexthop(&self, name: &Name) -> Option<FaceId> {
        self.measurements
            .find_longest_prefix_match(&self.name_tree, name, self.clock.now())
            .and_then(|entry| entry.last_nexthop)
    }

    /* ------------------------------------------------------------ *
     * Timers
     * ------------------------------------------------------------ */

    /// Runs every timer that is due. The event loop calls this after waking.
    pub fn poll_timers(&mut self) {
        let now = self.clock.now();
        while let Some(event) = self.scheduler.pop_due(now) {
            self.handle_timer(event);
        }
    }

    pub fn next_timer_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::PitExpiry(id) => self.on_pit_expiry(id),
            TimerEvent::PitStraggler(id) => {
                self.erase_pit_entry(id);
            }
            TimerEvent::ReassemblyTimeout { face, key } => {
                if let Some(face) = self.faces.get_mut(face) {
                    face.link_service_mut().reassembler_mut().on_timeout(key);
                }
            }
        }
    }

    fn on_pit_expiry(&mut self, id: PitEntryId) {
        let now = self.clock.now();
        let Some(entry) = self.pit.get(id) else {
            return;
        };
        if entry.satisfied {
            return;
        }
        // Renewed since the timer was armed; push the deadline out.
        if entry.expiry().is_some_and(|expiry| expiry > now) {
            self.reset_pit_expiry(id);
            return;
        }

        let name = entry.name().clone();
        debug!("PIT entry {} expired", name);
        if let Some(strategy) = self
            .strategy_choice
            .find_effective_strategy(&self.name_tree, &name)
        {
            strategy.before_expire_pending_interest(self, id);
        }
        self.metrics.interests_timed_out.increment();
        self.metrics.pit_expirations.increment();
        self.erase_pit_entry(id);
    }

    /* ------------------------------------------------------------ *
     * Internal send helpers
     * ------------------------------------------------------------ */

    fn send_data_to(&mut self, egress: FaceId, data: &Data) {
        let Some(face) = self.faces.get_mut(egress) else {
            return;
        };
        if !face.is_up() {
            return;
        }
        match face.send_data(data) {
            Ok(()) => self.metrics.data_sent.increment(),
            Err(e) => warn!("[face {}] send Data failed: {}", egress, e),
        }
    }

    fn transmit_nack(&mut self, egress: FaceId, interest: &Interest, reason: NackReason) {
        let Some(face) = self.faces.get_mut(egress) else {
            return;
        };
        if !face.is_up() {
            return;
        }
        let nack = Nack::new(reason, interest.clone());
        match face.send_nack(&nack) {
            Ok(()) => self.metrics.nacks_sent.increment(),
            Err(e) => warn!("[face {}] send Nack failed: {}", egress, e),
        }
    }

    fn insert_into_cs(&mut self, data: Data, is_unsolicited: bool, now: Instant) {
        let evicted = self.cs.insert(data, is_unsolicited, now);
        self.metrics.cs_inserts.increment();
        self.metrics.cs_evictions.add(evicted as u64);
        self.metrics.cs_size.set(self.cs.len() as u64);
    }

    fn reset_pit_expiry(&mut self, id: PitEntryId) {
        let (old_timer, deadline) = match self.pit.get_mut(id) {
            Some(entry) => (entry.expiry_timer.take(), entry.expiry()),
            None => return,
        };
        if let Some(timer) = old_timer {
            self.scheduler.cancel(timer);
        }
        let Some(deadline) = deadline else {
            return;
        };
        let timer = self.scheduler.schedule(deadline, TimerEvent::PitExpiry(id));
        if let Some(entry) = self.pit.get_mut(id) {
            entry.expiry_timer = Some(timer);
        }
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("faces", &self.faces.len())
            .field("fib", &self.fib.len())
            .field("pit", &self.pit.len())
            .field("cs", &self.cs.len())
            .finish()
    }
}
