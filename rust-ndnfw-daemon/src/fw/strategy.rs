//! Forwarding strategy interface and registry.
//!
//! A strategy decides where Interests go. The forwarder resolves the
//! strategy responsible for a PIT entry through the strategy choice table
//! and invokes the trigger hooks below; the strategy calls back into the
//! forwarder (`send_interest`, `send_nacks`, ...) to act. Per-entry strategy
//! state lives on the PIT entry itself.

use crate::face::FaceId;
use crate::fw::forwarder::Forwarder;
use crate::table::fib::NextHop;
use crate::table::pit::PitEntryId;
use rust_ndnfw_common::name::Name;
use rust_ndnfw_common::packet::{Data, Interest, Nack, NackReason};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Strategy-specific state attached to a PIT entry.
#[derive(Debug, Clone)]
pub enum StrategyInfo {
    RetxSuppression(RetxSuppressionInfo),
}

/// Per-upstream suppression windows (exponential backoff state).
#[derive(Debug, Clone, Default)]
pub struct RetxSuppressionInfo {
    pub intervals: HashMap<FaceId, Duration>,
}

pub trait Strategy: Send + Sync {
    /// The strategy instance name, e.g. `/localhost/nfd/strategy/multicast`.
    fn strategy_name(&self) -> &Name;

    /// An Interest was accepted into the PIT and needs forwarding.
    fn after_receive_interest(
        &self,
        fw: &mut Forwarder,
        interest: &Interest,
        ingress: FaceId,
        entry: PitEntryId,
    );

    /// A Nack arrived and was attached to the matching out-record.
    fn after_receive_nack(
        &self,
        fw: &mut Forwarder,
        _nack: &Nack,
        _ingress: FaceId,
        entry: PitEntryId,
    ) {
        propagate_nack_if_exhausted(fw, entry);
    }

    /// Data is about to satisfy the entry.
    fn before_satisfy_interest(
        &self,
        _fw: &mut Forwarder,
        _entry: PitEntryId,
        _ingress: FaceId,
        _data: &Data,
    ) {
    }

    /// The entry expired without Data.
    fn before_expire_pending_interest(&self, _fw: &mut Forwarder, _entry: PitEntryId) {}

    /// An Interest was answered from the content store.
    fn after_content_store_hit(
        &self,
        _fw: &mut Forwarder,
        _interest: &Interest,
        _ingress: FaceId,
        _data: &Data,
    ) {
    }

    /// A FIB update added `nexthop` while the entry is still pending.
    fn after_new_nexthop(&self, _fw: &mut Forwarder, _nexthop: NextHop, _entry: PitEntryId) {}
}

/// Instantiates the strategy registered under `name`.
pub fn create_strategy(name: &Name) -> Option<Arc<dyn Strategy>> {
    if *name == crate::fw::best_route::BestRouteStrategy::strategy_uri() {
        Some(Arc::new(crate::fw::best_route::BestRouteStrategy::new()))
    } else if *name == crate::fw::multicast::MulticastStrategy::strategy_uri() {
        Some(Arc::new(crate::fw::multicast::MulticastStrategy::new()))
    } else {
        None
    }
}

/// Once every upstream has answered with a Nack, propagates the least severe
/// reason to all downstreams and erases the entry. Returns true when the
/// entry was consumed this way.
pub fn propagate_nack_if_exhausted(fw: &mut Forwarder, entry: PitEntryId) -> bool {
    let reason = {
        let Some(entry) = fw.pit().get(entry) else {
            return false;
        };
        if !entry.all_out_records_nacked() {
            return false;
        }
        entry
            .out_records()
            .iter()
            .filter_map(|r| r.incoming_nack.as_ref())
            .map(|h| h.reason())
            .fold(NackReason::None, |least, reason| {
                if least == NackReason::None || reason.is_less_severe(least) {
                    reason
                } else {
                    least
                }
            })
    };

    fw.send_nacks(entry, reason);
    fw.erase_pit_entry(entry);
    true
}
