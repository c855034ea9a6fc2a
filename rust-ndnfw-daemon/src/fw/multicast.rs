//! Multicast forwarding strategy: Interests go to all FIB nexthops.

use crate::face::FaceId;
use crate::fw::forwarder::Forwarder;
use crate::fw::retx_suppression::{RetxSuppressionExponential, RetxSuppressionResult};
use crate::fw::strategy::Strategy;
use crate::table::fib::NextHop;
use crate::table::pit::PitEntryId;
use log::debug;
use rust_ndnfw_common::name::Name;
use rust_ndnfw_common::packet::{Interest, NackReason};

pub struct MulticastStrategy {
    name: Name,
    retx: RetxSuppressionExponential,
}

impl MulticastStrategy {
    pub fn strategy_uri() -> Name {
        Name::from_string("/localhost/nfd/strategy/multicast")
    }

    pub fn new() -> Self {
        Self {
            name: Self::strategy_uri(),
            retx: RetxSuppressionExponential::new(),
        }
    }
}

impl Default for MulticastStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MulticastStrategy {
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
        let nexthops = fw.lookup_nexthops(interest, ingress);

        let mut forwarded = false;
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
                debug!(
                    "multicast: suppressed retransmission of {} to face {}",
                    interest.name, nexthop.face
                );
                continue;
            }
            fw.send_interest(entry, nexthop.face);
            forwarded = true;
        }

        if !has_eligible {
            debug!("multicast: no route for {}", interest.name);
            fw.send_nacks(entry, NackReason::NoRoute);
            fw.erase_pit_entry(entry);
        } else if !forwarded {
            debug!("multicast: all upstreams suppressed for {}", interest.name);
        }
    }

    fn after_new_nexthop(&self, fw: &mut Forwarder, nexthop: NextHop, entry: PitEntryId) {
        let now = fw.clock_now();
        let Some(pit_entry) = fw.pit_mut().get_mut(entry) else {
            return;
        };
        if pit_entry.satisfied || pit_entry.in_records().is_empty() {
            return;
        }
        let ingress_only = pit_entry.in_records().len() == 1
            && pit_entry.in_records()[0].face == nexthop.face;
        if ingress_only {
            return;
        }
        if self.retx.decide(now, pit_entry, nexthop.face) == RetxSuppressionResult::Suppress {
            return;
        }
        fw.send_interest(entry, nexthop.face);
    }
}
