// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ctx::{DetectCtx, DetectEnv, SigTable};
use crate::fake::{NeverFlowMatch, TestRig, TxSeen};
use crate::registry::{DceInspect, EngineRegistry};
use parking_lot::RwLock;
use vigil_applayer::{AppLayerState, IpProto, ParserRegistry};
use vigil_core::{Action, SigFlags, SigId, StreamFlags};

fn method_cookie_sig() -> Signature {
    Signature::new(SigId(0))
        .with_tx_list(SmList::HttpMethod, "POST".to_string())
        .with_tx_list(SmList::HttpCookie, "dummy".to_string())
}

#[test]
fn partial_match_persists_resumable_record() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(method_cookie_sig());

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\n");

    assert!(alerts.is_empty());
    assert_eq!(rig.tx_record_count(0), 1);
    let record = rig.tx_record(0, 0).unwrap();
    assert_eq!(record.sid, sid);
    assert!(record.flags.contains(InspectFlags::METHOD));
    assert!(!record
        .flags
        .intersects(InspectFlags::FULL_INSPECT | InspectFlags::CANT_MATCH));
}

#[test]
fn cant_match_persists_terminal_record() {
    let mut rig = TestRig::http();
    rig.add_sig(
        Signature::new(SigId(0)).with_tx_list(SmList::HttpMethod, "GET".to_string()),
    );

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\n");

    assert!(alerts.is_empty());
    let record = rig.tx_record(0, 0).unwrap();
    assert!(record
        .flags
        .contains(InspectFlags::CANT_MATCH | InspectFlags::FULL_INSPECT | InspectFlags::METHOD));
}

#[test]
fn full_match_on_incomplete_tx_alerts_and_stores() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(
        Signature::new(SigId(0)).with_tx_list(SmList::HttpMethod, "POST".to_string()),
    );

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\n");

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].sid, sid);
    assert_eq!(alerts[0].tx_id, Some(0));
    assert!(alerts[0]
        .flags
        .contains(AlertFlags::STATE_MATCH | AlertFlags::TX));
    let record = rig.tx_record(0, 0).unwrap();
    assert!(record.flags.contains(InspectFlags::FULL_INSPECT));
}

#[test]
fn full_match_on_completed_last_tx_stores_no_record() {
    let mut rig = TestRig::http();
    rig.add_sig(
        Signature::new(SigId(0)).with_tx_list(SmList::HttpMethod, "POST".to_string()),
    );

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\nCookie: x\r\n\r\n");

    assert_eq!(alerts.len(), 1);
    assert_eq!(rig.tx_record_count(0), 0);
}

#[test]
fn repeated_start_never_duplicates_records() {
    let mut rig = TestRig::http();
    rig.add_sig(method_cookie_sig());

    rig.feed_ts("POST / HTTP/1.0\r\n");
    assert_eq!(rig.tx_record_count(0), 1);

    // a second detection pass over the same data appends nothing
    let alerts = rig.detect(StreamFlags::empty());
    assert!(alerts.is_empty());
    assert_eq!(rig.tx_record_count(0), 1);
}

#[test]
fn noalert_sig_applies_action_instead_of_alerting() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(
        Signature::new(SigId(0))
            .with_flags(SigFlags::NOALERT)
            .with_action(Action::DROP)
            .with_tx_list(SmList::HttpMethod, "POST".to_string()),
    );
    rig.with_http(|http| http.parse_ts("POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\n"));
    rig.version += 1;

    let env = DetectEnv {
        registry: &rig.registry,
        parsers: &rig.parsers,
        sigs: &rig.sigs,
    };
    let mut p = Packet::new(StreamFlags::TO_SERVER);
    let s = rig.sigs.get(sid).unwrap();
    let alerted = start_detection(
        &mut rig.ctx,
        &env,
        s,
        &mut p,
        &rig.flow,
        AppProto::Http,
        rig.version,
    );

    assert!(!alerted);
    assert!(rig.ctx.alerts().is_empty());
    assert!(p.action.contains(Action::DROP));
}

#[test]
fn flow_record_persisted_even_without_progress() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(
        Signature::new(SigId(0))
            .with_flow_match(TxSeen)
            .with_flow_match(crate::fake::CookieSeen("nope".to_string())),
    );

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\n");

    assert!(alerts.is_empty());
    let f = rig.flow.read();
    let detect = f.detect.as_ref().unwrap();
    let record = detect
        .dir(vigil_core::Direction::ToServer)
        .sigs
        .get(0)
        .copied()
        .unwrap();
    assert_eq!(record.sid, sid);
    // the first submatch matched, the walk suspended on the second
    assert_eq!(record.cursor, Some(1));
    assert!(!record.flags.contains(InspectFlags::FULL_INSPECT));
}

#[test]
fn flow_cant_match_settles_record() {
    let mut rig = TestRig::http();
    rig.add_sig(Signature::new(SigId(0)).with_flow_match(NeverFlowMatch));

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\n");

    assert!(alerts.is_empty());
    let f = rig.flow.read();
    let record = f
        .detect
        .as_ref()
        .unwrap()
        .dir(vigil_core::Direction::ToServer)
        .sigs
        .get(0)
        .copied()
        .unwrap();
    assert!(record
        .flags
        .contains(InspectFlags::CANT_MATCH | InspectFlags::FULL_INSPECT));
}

/// Minimal DCE-carrying state: no transactions, payload inspected in one
/// shot.
#[derive(Debug, Default)]
struct FakeDceState {
    opnum: u16,
}

impl AppLayerState for FakeDceState {
    fn tx_count(&self) -> u64 {
        0
    }

    fn tx(&self, _tx_id: u64) -> Option<&dyn vigil_applayer::AppLayerTx> {
        None
    }

    fn tx_mut(&mut self, _tx_id: u64) -> Option<&mut dyn vigil_applayer::AppLayerTx> {
        None
    }

    fn dce_state(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

struct OpnumInspect(u16);

impl DceInspect for OpnumInspect {
    fn inspect(&self, _s: &Signature, _stream: StreamFlags, dce: &dyn std::any::Any) -> bool {
        dce.downcast_ref::<FakeDceState>()
            .is_some_and(|state| state.opnum == self.0)
    }
}

#[test]
fn dce_match_alerts_without_persisting() {
    let mut registry = EngineRegistry::new();
    registry.set_dce_inspector(OpnumInspect(7));
    let parsers = ParserRegistry::new();
    let mut sigs = SigTable::new();
    let sid = sigs.push(Signature::new(SigId(0)).with_tx_list(SmList::Dce, "bind".to_string()));

    let mut flow = Flow::new(IpProto::Tcp, AppProto::DceRpc);
    flow.alstate = Some(Box::new(FakeDceState { opnum: 7 }));
    let flow = RwLock::new(flow);

    let env = DetectEnv {
        registry: &registry,
        parsers: &parsers,
        sigs: &sigs,
    };
    let mut ctx = DetectCtx::new(1);
    let mut p = Packet::new(StreamFlags::TO_SERVER);
    let s = sigs.get(sid).unwrap();

    let alerted = start_detection(&mut ctx, &env, s, &mut p, &flow, AppProto::DceRpc, 1);

    assert!(alerted);
    assert_eq!(ctx.alerts().len(), 1);
    assert_eq!(ctx.alerts()[0].tx_id, None);
    // one-shot: no continuation record of any kind
    assert!(flow.read().detect.is_none());
}
