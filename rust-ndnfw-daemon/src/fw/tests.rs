//! End-to-end pipeline tests driving the forwarder over dummy faces with a
//! manual clock.

use crate::clock::{Clock, ManualClock};
use crate::config::ForwarderConfig;
use crate::face::transport::DummyTransport;
use crate::face::{FaceId, FaceScope};
use crate::fw::forwarder::Forwarder;
use crate::fw::multicast::MulticastStrategy;
use bytes::Bytes;
use rust_ndnfw_common::lp::{LpPacket, NackHeader};
use rust_ndnfw_common::name::Name;
use rust_ndnfw_common::packet::{Data, Interest, NackReason, NdnPacket};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct TestFace {
    id: FaceId,
    sent: Arc<Mutex<Vec<Bytes>>>,
}

impl TestFace {
    fn sent_lp(&self) -> Vec<LpPacket> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|wire| LpPacket::from_wire(wire).unwrap())
            .collect()
    }

    fn sent_interests(&self) -> Vec<Interest> {
        self.sent_lp()
            .into_iter()
            .filter(|lp| lp.nack.is_none())
            .filter_map(|lp| {
                match NdnPacket::from_bytes(lp.fragment.as_ref()?).ok()? {
                    NdnPacket::Interest(interest) => Some(interest),
                    NdnPacket::Data(_) => None,
                }
            })
            .collect()
    }

    fn sent_data(&self) -> Vec<Data> {
        self.sent_lp()
            .into_iter()
            .filter_map(|lp| {
                match NdnPacket::from_bytes(lp.fragment.as_ref()?).ok()? {
                    NdnPacket::Data(data) => Some(data),
                    NdnPacket::Interest(_) => None,
                }
            })
            .collect()
    }

    fn sent_nacks(&self) -> Vec<(NackReason, Interest)> {
        self.sent_lp()
            .into_iter()
            .filter_map(|lp| {
                let reason = lp.nack?.reason();
                match NdnPacket::from_bytes(lp.fragment.as_ref()?).ok()? {
                    NdnPacket::Interest(interest) => Some((reason, interest)),
                    NdnPacket::Data(_) => None,
                }
            })
            .collect()
    }
}

struct Fixture {
    fw: Forwarder,
    clock: Arc<ManualClock>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(ForwarderConfig::default())
    }

    fn with_config(config: ForwarderConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let fw = Forwarder::new(config, Arc::clone(&clock) as Arc<dyn Clock>);
        Self { fw, clock }
    }

    fn add_face(&mut self) -> TestFace {
        self.add_face_with_scope(FaceScope::NonLocal)
    }

    fn add_face_with_scope(&mut self, scope: FaceScope) -> TestFace {
        let transport = DummyTransport::new();
        let sent = transport.sent_handle();
        let id = self.fw.add_face(scope, Box::new(transport));
        TestFace { id, sent }
    }

    fn advance(&mut self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        self.fw.poll_timers();
    }

    fn receive_interest(&mut self, face: &TestFace, interest: &Interest) {
        self.fw.on_receive(face.id, 0, &interest.to_wire());
    }

    fn receive_data(&mut self, face: &TestFace, data: &Data) {
        self.fw.on_receive(face.id, 0, &data.to_wire());
    }

    fn receive_nack(&mut self, face: &TestFace, reason: NackReason, interest: &Interest) {
        let lp = LpPacket {
            nack: Some(NackHeader::new(reason)),
            fragment: Some(interest.to_wire()),
            ..Default::default()
        };
        self.fw.on_receive(face.id, 0, &lp.to_wire());
    }
}

fn interest(name: &str, nonce: u32) -> Interest {
    Interest::new(Name::from_string(name))
        .with_nonce(nonce)
        .with_lifetime_ms(4000)
}

fn data(name: &str) -> Data {
    Data::new(Name::from_string(name), Bytes::from_static(b"payload"))
}

#[test]
fn test_interest_data_roundtrip() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/a"), f2.id, 10);

    let request = interest("/a/b", 0x01020304)
        .with_can_be_prefix(true)
        .with_lifetime_ms(1000);
    fx.receive_interest(&f1, &request);

    // Forwarded upstream with an out-record on F2.
    let forwarded = f2.sent_interests();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].name, Name::from_string("/a/b"));
    assert_eq!(forwarded[0].nonce, 0x01020304);

    let id = fx.fw.pit().find(fx.fw.name_tree(), &request).unwrap();
    assert!(fx.fw.pit().get(id).unwrap().out_record_of(f2.id).is_some());

    // The producer answers with a longer name; CanBePrefix matches it.
    fx.receive_data(&f2, &data("/a/b/c"));

    let delivered = f1.sent_data();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].name, Name::from_string("/a/b/c"));
    assert!(fx.fw.cs().contains(&Name::from_string("/a/b/c")));

    // The satisfied entry lingers for the straggler window, then goes away.
    assert_eq!(fx.fw.pit().len(), 1);
    fx.advance(150);
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_looped_interest_gets_duplicate_nack() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/x"), f3.id, 10);

    let nonce = 0xdeadbeef;
    fx.receive_interest(&f1, &interest("/x", nonce));
    fx.advance(20);
    // The same Interest arrives via another face: a loop.
    fx.receive_interest(&f2, &interest("/x", nonce));

    let nacks = f2.sent_nacks();
    assert_eq!(nacks.len(), 1);
    assert_eq!(nacks[0].0, NackReason::Duplicate);
    assert_eq!(nacks[0].1.nonce, nonce);
    assert_eq!(fx.fw.metrics().loops_detected.value(), 1);

    // The loop did not add a downstream record for F2.
    let id = fx.fw.pit().find(fx.fw.name_tree(), &interest("/x", nonce)).unwrap();
    assert!(fx.fw.pit().get(id).unwrap().in_record_of(f2.id).is_none());
}

#[test]
fn test_retransmission_from_same_face_is_not_a_loop() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/x"), f2.id, 10);

    let request = interest("/x", 7);
    fx.receive_interest(&f1, &request);
    fx.advance(20);
    fx.receive_interest(&f1, &request);

    assert!(f1.sent_nacks().is_empty());
    assert_eq!(fx.fw.pit().len(), 1);
    // The retransmission was forwarded again (outside the 10 ms window).
    assert_eq!(f2.sent_interests().len(), 2);
}

#[test]
fn test_cs_hit_respects_freshness() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/d"), f2.id, 10);

    let fresh_interest = |nonce| interest("/d", nonce).with_must_be_fresh(true);

    // Populate the CS through the Data pipeline.
    fx.receive_interest(&f1, &fresh_interest(1));
    assert_eq!(f2.sent_interests().len(), 1);
    fx.receive_data(&f2, &data("/d").with_freshness_ms(100));
    assert_eq!(f1.sent_data().len(), 1);

    // While fresh, the CS answers.
    fx.advance(50);
    fx.receive_interest(&f1, &fresh_interest(2));
    assert_eq!(f1.sent_data().len(), 2);
    assert_eq!(f2.sent_interests().len(), 1);
    assert_eq!(fx.fw.metrics().cs_hits.value(), 1);

    // Once stale, MustBeFresh forces a forward again.
    fx.advance(100);
    fx.receive_interest(&f1, &fresh_interest(3));
    assert_eq!(f1.sent_data().len(), 2);
    assert_eq!(f2.sent_interests().len(), 2);
}

#[test]
fn test_fragmented_interest_is_reassembled() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/frag"), f2.id, 10);

    let wire = interest("/frag/x", 5).to_wire();
    let third = wire.len() / 3;
    let parts = [
        wire.slice(0..third),
        wire.slice(third..2 * third),
        wire.slice(2 * third..),
    ];
    for (index, part) in parts.iter().enumerate() {
        let lp = LpPacket {
            sequence: Some(100 + index as u64),
            frag_index: Some(index as u64),
            frag_count: Some(3),
            fragment: Some(part.clone()),
            ..Default::default()
        };
        fx.fw.on_receive(f1.id, 0, &lp.to_wire());
    }

    let forwarded = f2.sent_interests();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].name, Name::from_string("/frag/x"));
}

#[test]
fn test_reassembly_timeout_drops_partial_packet() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();

    let wire = interest("/frag/x", 5).to_wire();
    for index in 0..2u64 {
        let lp = LpPacket {
            sequence: Some(100 + index),
            frag_index: Some(index),
            frag_count: Some(3),
            fragment: Some(wire.slice(0..4)),
            ..Default::default()
        };
        fx.fw.on_receive(f1.id, 7, &lp.to_wire());
    }

    let observed = Arc::new(Mutex::new(None));
    let observed_clone = Arc::clone(&observed);
    let _connection = fx
        .fw
        .faces()
        .get(f1.id)
        .unwrap()
        .link_service()
        .reassembler()
        .before_timeout
        .connect(move |(endpoint, n_received)| {
            *observed_clone.lock().unwrap() = Some((*endpoint, *n_received));
        });

    assert_eq!(
        fx.fw.faces().get(f1.id).unwrap().link_service().reassembler().n_partial_packets(),
        1
    );
    fx.advance(500);
    assert_eq!(*observed.lock().unwrap(), Some((7, 2)));
    assert_eq!(
        fx.fw.faces().get(f1.id).unwrap().link_service().reassembler().n_partial_packets(),
        0
    );
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_lru_eviction_through_pipeline() {
    let mut fx = Fixture::with_config(ForwarderConfig {
        cs_max_packets: 2,
        cs_unsolicited_policy: "admit-all".to_string(),
        ..Default::default()
    });
    let f1 = fx.add_face();

    for name in ["/1", "/2", "/3"] {
        fx.receive_data(&f1, &data(name).with_freshness_ms(60000));
    }
    assert_eq!(fx.fw.cs().len(), 2);
    assert!(!fx.fw.cs().contains(&Name::from_string("/1")));
    assert!(fx.fw.cs().contains(&Name::from_string("/2")));
    assert!(fx.fw.cs().contains(&Name::from_string("/3")));

    // A lookup moves /2 to the fresh end of the queue.
    fx.receive_interest(&f1, &interest("/2", 9));
    assert_eq!(f1.sent_data().len(), 1);

    fx.receive_data(&f1, &data("/4").with_freshness_ms(60000));
    assert!(fx.fw.cs().contains(&Name::from_string("/2")));
    assert!(!fx.fw.cs().contains(&Name::from_string("/3")));
    assert!(fx.fw.cs().contains(&Name::from_string("/4")));
}

#[test]
fn test_nack_aggregation() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/y"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/y", 0xaaaa));
    fx.advance(20);
    fx.receive_interest(&f3, &interest("/y", 0xbbbb));

    // Both downstreams aggregate into one entry with a single upstream.
    assert_eq!(fx.fw.pit().len(), 1);
    let upstream = f2.sent_interests();
    assert!(!upstream.is_empty());
    let last_nonce = upstream.last().unwrap().nonce;

    fx.receive_nack(&f2, NackReason::NoRoute, &interest("/y", last_nonce));

    let nacks1 = f1.sent_nacks();
    let nacks3 = f3.sent_nacks();
    assert_eq!(nacks1.len(), 1);
    assert_eq!(nacks3.len(), 1);
    assert_eq!(nacks1[0].0, NackReason::NoRoute);
    assert_eq!(nacks3[0].0, NackReason::NoRoute);
    // Each downstream gets a Nack referencing its own nonce.
    assert_eq!(nacks1[0].1.nonce, 0xaaaa);
    assert_eq!(nacks3[0].1.nonce, 0xbbbb);
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_nack_nonce_mismatch_is_dropped() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/y"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/y", 0x1111));
    fx.receive_nack(&f2, NackReason::NoRoute, &interest("/y", 0x2222));

    assert!(f1.sent_nacks().is_empty());
    assert_eq!(fx.fw.pit().len(), 1);
    let id = fx.fw.pit().find(fx.fw.name_tree(), &interest("/y", 0x1111)).unwrap();
    let entry = fx.fw.pit().get(id).unwrap();
    assert!(entry.out_record_of(f2.id).unwrap().incoming_nack.is_none());
}

#[test]
fn test_no_route_yields_noroute_nack() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();

    fx.receive_interest(&f1, &interest("/nowhere", 3));

    let nacks = f1.sent_nacks();
    assert_eq!(nacks.len(), 1);
    assert_eq!(nacks[0].0, NackReason::NoRoute);
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_pit_entry_expires_without_data() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/x"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/x", 1).with_lifetime_ms(1000));
    assert_eq!(fx.fw.pit().len(), 1);

    fx.advance(999);
    assert_eq!(fx.fw.pit().len(), 1);
    fx.advance(2);
    assert_eq!(fx.fw.pit().len(), 0);
    assert_eq!(fx.fw.metrics().interests_timed_out.value(), 1);
    // The record survives for the FIB entry, but no PIT reference remains.
    let record = fx
        .fw
        .name_tree()
        .find_exact_match(&Name::from_string("/x"))
        .unwrap();
    assert!(record.pit_entries.is_empty());
}

#[test]
fn test_renewed_in_record_postpones_expiry() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/x"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/x", 1).with_lifetime_ms(1000));
    fx.advance(800);
    fx.receive_interest(&f1, &interest("/x", 2).with_lifetime_ms(1000));

    fx.advance(900);
    assert_eq!(fx.fw.pit().len(), 1);
    fx.advance(200);
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_face_close_purges_tables() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/x"), f2.id, 10);
    fx.fw.add_route(&Name::from_string("/x"), f3.id, 20);

    fx.receive_interest(&f1, &interest("/x", 1));
    let id = fx.fw.pit().find(fx.fw.name_tree(), &interest("/x", 1)).unwrap();
    assert!(fx.fw.pit().get(id).unwrap().out_record_of(f2.id).is_some());

    fx.fw.remove_face(f2.id);

    assert!(!fx.fw.faces().contains(f2.id));
    // FIB keeps only the surviving nexthop; PIT records for F2 are gone.
    let fib_entry = fx
        .fw
        .fib()
        .find_longest_prefix_match(fx.fw.name_tree(), &Name::from_string("/x"))
        .unwrap();
    assert_eq!(fib_entry.nexthops().len(), 1);
    assert_eq!(fib_entry.nexthops()[0].face, f3.id);
    assert!(fx.fw.pit().get(id).unwrap().out_record_of(f2.id).is_none());
    // The downstream record survives, so the Interest can still be answered.
    assert!(fx.fw.pit().get(id).unwrap().in_record_of(f1.id).is_some());
}

#[test]
fn test_unsolicited_data_dropped_by_default() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();

    fx.receive_data(&f1, &data("/stray"));

    assert_eq!(fx.fw.cs().len(), 0);
    assert_eq!(fx.fw.metrics().data_received.value(), 1);
}

#[test]
fn test_hop_limit_enforced_and_decremented() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/h"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/h/dead", 1).with_hop_limit(0));
    assert!(f2.sent_interests().is_empty());
    assert_eq!(fx.fw.metrics().dropped_policy.value(), 1);
    assert_eq!(fx.fw.pit().len(), 0);

    fx.receive_interest(&f1, &interest("/h/alive", 2).with_hop_limit(2));
    let forwarded = f2.sent_interests();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].hop_limit, Some(1));
}

#[test]
fn test_forwarding_hint_honored_for_nonlocal_ingress() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/hub"), f2.id, 10);

    let mut hinted = interest("/content/elsewhere", 4);
    hinted.forwarding_hint.push(Name::from_string("/hub"));
    fx.receive_interest(&f1, &hinted);

    assert_eq!(f2.sent_interests().len(), 1);
}

#[test]
fn test_forwarding_hint_ignored_for_local_ingress() {
    let mut fx = Fixture::new();
    let local = fx.add_face_with_scope(FaceScope::Local);
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/hub"), f2.id, 10);

    let mut hinted = interest("/content/elsewhere", 4);
    hinted.forwarding_hint.push(Name::from_string("/hub"));
    fx.receive_interest(&local, &hinted);

    // The name itself has no route, so the hint being ignored means NoRoute.
    assert!(f2.sent_interests().is_empty());
    assert_eq!(local.sent_nacks().len(), 1);
    assert_eq!(local.sent_nacks()[0].0, NackReason::NoRoute);
}

#[test]
fn test_multicast_forwards_to_all_nexthops() {
    let mut fx = Fixture::new();
    assert!(fx
        .fw
        .set_strategy(Name::from_string("/m"), &MulticastStrategy::strategy_uri()));
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/m"), f2.id, 10);
    fx.fw.add_route(&Name::from_string("/m"), f3.id, 20);

    fx.receive_interest(&f1, &interest("/m/x", 1));

    assert_eq!(f2.sent_interests().len(), 1);
    assert_eq!(f3.sent_interests().len(), 1);
    // Not back to the requester.
    assert!(f1.sent_interests().is_empty());
}

#[test]
fn test_multicast_aggregates_nacks_with_least_severe_reason() {
    let mut fx = Fixture::new();
    assert!(fx
        .fw
        .set_strategy(Name::from_string("/m"), &MulticastStrategy::strategy_uri()));
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/m"), f2.id, 10);
    fx.fw.add_route(&Name::from_string("/m"), f3.id, 20);

    let nonce = 0x42;
    fx.receive_interest(&f1, &interest("/m/x", nonce));

    fx.receive_nack(&f2, NackReason::Congestion, &interest("/m/x", nonce));
    // One upstream is still pending; nothing propagates yet.
    assert!(f1.sent_nacks().is_empty());

    fx.receive_nack(&f3, NackReason::NoRoute, &interest("/m/x", nonce));
    let nacks = f1.sent_nacks();
    assert_eq!(nacks.len(), 1);
    assert_eq!(nacks[0].0, NackReason::Congestion);
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_best_route_retries_other_nexthop_on_nack() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/r"), f2.id, 10);
    fx.fw.add_route(&Name::from_string("/r"), f3.id, 20);

    let nonce = 0x77;
    fx.receive_interest(&f1, &interest("/r/x", nonce));
    // Lowest cost first.
    assert_eq!(f2.sent_interests().len(), 1);
    assert!(f3.sent_interests().is_empty());

    fx.receive_nack(&f2, NackReason::Congestion, &interest("/r/x", nonce));

    // The strategy fails over instead of propagating.
    assert!(f1.sent_nacks().is_empty());
    assert_eq!(f3.sent_interests().len(), 1);
}

#[test]
fn test_best_route_prefers_remembered_working_upstream() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    // F2 is cheaper, but F3 will prove itself by answering.
    fx.fw.add_route(&Name::from_string("/p"), f2.id, 10);
    fx.fw.add_route(&Name::from_string("/p"), f3.id, 20);

    fx.receive_interest(&f1, &interest("/p/1", 1));
    assert_eq!(f2.sent_interests().len(), 1);
    fx.receive_nack(&f2, NackReason::Congestion, &interest("/p/1", 1));
    assert_eq!(f3.sent_interests().len(), 1);
    fx.receive_data(&f3, &data("/p/1"));

    fx.advance(150);
    // The next Interest under /p goes straight to the working upstream.
    fx.receive_interest(&f1, &interest("/p/2", 2));
    assert_eq!(f3.sent_interests().len(), 2);
    assert_eq!(f2.sent_interests().len(), 1);
}

#[test]
fn test_new_nexthop_forwards_pending_interest() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/n"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/n/x", 1));
    assert_eq!(f2.sent_interests().len(), 1);

    // A route shows up while the entry is pending.
    fx.fw.add_route(&Name::from_string("/n"), f3.id, 5);
    assert_eq!(f3.sent_interests().len(), 1);
}

#[test]
fn test_data_forwarded_once_per_downstream() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    let f3 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/o"), f2.id, 10);

    fx.advance(20);
    fx.receive_interest(&f1, &interest("/o/x", 1));
    fx.advance(20);
    fx.receive_interest(&f3, &interest("/o/x", 2));

    fx.receive_data(&f2, &data("/o/x"));

    assert_eq!(f1.sent_data().len(), 1);
    assert_eq!(f3.sent_data().len(), 1);
    // The upstream is never sent its own Data back.
    assert!(f2.sent_data().is_empty());
}

#[test]
fn test_straggler_data_does_not_resend_downstream() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/s"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/s/x", 1));
    fx.receive_data(&f2, &data("/s/x"));
    assert_eq!(f1.sent_data().len(), 1);

    // A duplicate within the straggler window is observed but not re-sent.
    fx.advance(50);
    fx.receive_data(&f2, &data("/s/x"));
    assert_eq!(f1.sent_data().len(), 1);
    assert_eq!(fx.fw.pit().len(), 1);

    fx.advance(100);
    assert_eq!(fx.fw.pit().len(), 0);
}

#[test]
fn test_face_counters_monotonic_through_traffic() {
    let mut fx = Fixture::new();
    let f1 = fx.add_face();
    let f2 = fx.add_face();
    fx.fw.add_route(&Name::from_string("/c"), f2.id, 10);

    fx.receive_interest(&f1, &interest("/c/x", 1));
    fx.receive_data(&f2, &data("/c/x"));

    let c1 = fx.fw.faces().get(f1.id).unwrap().counters().clone();
    assert_eq!(c1.n_in_interests.value(), 1);
    assert_eq!(c1.n_out_data.value(), 1);
    assert!(c1.n_in_bytes.value() > 0);
    assert!(c1.n_out_bytes.value() > 0);

    let c2 = fx.fw.faces().get(f2.id).unwrap().counters().clone();
    assert_eq!(c2.n_out_interests.value(), 1);
    assert_eq!(c2.n_in_data.value(), 1);
}
