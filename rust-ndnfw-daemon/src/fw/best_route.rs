//! Best-route forwarding strategy.
//!
//! Forwards each Interest to the single lowest-cost eligible nexthop,
//! preferring an upstream that recently satisfied Interests under the same
//! prefix. A Nack triggers a retry on an untried nexthop; once every tried
//! upstream has Nacked, the Nack is propagated downstream.

use crate::face::FaceId;
use crate::fw::forwarder::Forwarder;
use crate::fw::retx_suppression::{RetxSuppressionExponential, RetxSuppressionResult};
use crate::fw::strategy::{propagate_nack_if_exhausted, Strategy};
use crate::table::fib::NextHop;
use crate::table::pit::PitEntryId;
use log::debug;
use rust_ndnfw_common::name::Name;
use rust_ndnfw_common::packet::{Data, Interest, Nack, NackReason};
use std::time::Duration;

/// How long a known-working upstream is remembered per prefix.
const MEASUREMENTS_LIFETIME: Duration = Duration::from_secs(8);

pub struct BestRouteStrategy {
    name: Name,
    retx: RetxSuppressionExponential,
}

impl BestRouteStrategy {
    pub fn strategy_uri() -> Name {
        Name::from_string("/localhost/nfd/strategy/best-route")
    }

    pub fn new() -> Self {
        Self {
            name: Self::strategy_uri(),
            retx: RetxSuppressionExponential::new(),
        }
    }

    /// Candidate nexthops in preference order: the remembered working
    /// upstream first, then ascending (cost, face).
    fn ordered_nexthops(
        &self,
        fw: &Forwarder,
        interest: &Interest,
        ingress: FaceId,
    ) -> Vec<NextHop> {
        let mut nexthops = fw.lookup_nexthops(interest, ingress);
        if let Some(preferred) = fw.preferred_nexthop(&interest.name) {
            if let Some(pos) = nexthops.iter().position(|nh| nh.face == preferred) {
                let nexthop = nexthops.remove(pos);
                nexthops.insert(0, nexthop);
            }
        }
        nexthops
    }
}

impl Default for BestRouteStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BestRouteStrategy {
    fn strategy_name(&self) -> &Name {
        &self.name
    }

    fn after_receive_interest(
        &self,
        fw: &mut Forwarder,
        interest: &Interest,
        ingress: FaceId,
        entry: PitEntryId,
    ) {
        let now = fw.clock_now();
        let nexthops = self.ordered_nexthops(fw, interest, ingress);

        let mut has_eligible = false;
        for nexthop in nexthops {
            if !fw.is_eligible_nexthop(nexthop.face, ingress) {
                continue;
            }
            has_eligible = true;

            let Some(pit_entry) = fw.pit_mut().get_mut(entry) else {
                return;
            };
            if self.retx.decide(now, pit_entry, nexthop.face) == RetxSuppressionResult::Suppress {
                continue;
            }
            fw.send_interest(entry, nexthop.face);
            return;
        }

        if has_eligible {
            // Everything in range is suppressed; wait for the windows.
            debug!("best-route: all upstreams suppressed for {}", interest.name);
            return;
        }

        debug!("best-route: no route for {}", interest.name);
        fw.send_nacks(entry, NackReason::NoRoute);
        fw.erase_pit_entry(entry);
    }

    fn after_receive_nack(
        &self,
        fw: &mut Forwarder,
        nack: &Nack,
        ingress: FaceId,
        entry: PitEntryId,
    ) {
        // Retry on a nexthop that has not been tried for this entry yet.
        let nexthops = self.ordered_nexthops(fw, &nack.interest, ingress);
        for nexthop in nexthops {
            if !fw.is_eligible_nexthop(nexthop.face, ingress) {
                continue;
            }
            let tried = fw
                .pit()
                .get(entry)
                .is_some_and(|e| e.out_record_of(nexthop.face).is_some());
            if tried {
                continue;
            }
            debug!(
                "best-route: retrying {} on face {} after Nack",
                nack.interest.name, nexthop.face
            );
            fw.send_interest(entry, nexthop.face);
            return;
        }

        propagate_nack_if_exhausted(fw, entry);
    }

    fn before_satisfy_interest(
        &self,
        fw: &mut Forwarder,
        entry: PitEntryId,
        ingress: FaceId,
        _data: &Data,
    ) {
        // Remember the upstream that delivered, keyed by the producer prefix
        // (the entry name minus its last component), for future Interests.
        let Some(name) = fw.pit().get(entry).map(|e| e.name().clone()) else {
            return;
        };
        let prefix = name.prefix(name.len().saturating_sub(1));
        fw.record_working_nexthop(&prefix, ingress, MEASUREMENTS_LIFETIME);
    }

    fn after_new_nexthop(&self, fw: &mut Forwarder, nexthop: NextHop, entry: PitEntryId) {
        let Some(pit_entry) = fw.pit().get(entry) else {
            return;
        };
        if pit_entry.satisfied
            || pit_entry.in_records().is_empty()
            || pit_entry.out_record_of(nexthop.face).is_some()
        {
            return;
        }
        let ingress_only = pit_entry.in_records().len() == 1
            && pit_entry.in_records()[0].face == nexthop.face;
        if ingress_only {
            return;
        }
        fw.send_interest(entry, nexthop.face);
    }
}
