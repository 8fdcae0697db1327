// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow-scoped rules: the cursor suspends and resumes across packets.

use crate::prelude::*;
use vigil_core::{Direction, InspectFlags};
use vigil_engine::fake::{CookieSeen, NeverFlowMatch, TxSeen};

#[test]
fn flow_rule_suspends_then_completes() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(
        Signature::new(SigId(0))
            .with_flow_match(TxSeen)
            .with_flow_match(CookieSeen("session=".to_string())),
    );

    // request line only: the walk suspends on the cookie submatch
    assert!(rig.feed_ts("GET /login HTTP/1.1\r\n").is_empty());
    {
        let f = rig.flow.read();
        let record = f
            .detect
            .as_ref()
            .unwrap()
            .dir(Direction::ToServer)
            .sigs
            .get(0)
            .copied()
            .unwrap();
        assert_eq!(record.cursor, Some(1));
    }

    // the cookie shows up: the suspended walk completes and alerts
    let alerts = rig.feed_ts("Cookie: session=abc123\r\n");
    assert_eq!(sids(&alerts), vec![sid]);
    assert_eq!(alerts[0].tx_id, None);

    // and the settled record never fires again
    assert!(rig.feed_ts("X-Pad: 1\r\n\r\n").is_empty());
}

#[test]
fn flow_rule_cant_match_is_terminal() {
    let mut rig = TestRig::http();
    rig.add_sig(
        Signature::new(SigId(0))
            .with_flow_match(TxSeen)
            .with_flow_match(NeverFlowMatch),
    );

    assert!(rig.feed_ts("GET / HTTP/1.1\r\n").is_empty());
    assert!(rig.feed_ts("Cookie: whatever\r\n\r\n").is_empty());

    let f = rig.flow.read();
    let record = f
        .detect
        .as_ref()
        .unwrap()
        .dir(Direction::ToServer)
        .sigs
        .get(0)
        .copied()
        .unwrap();
    assert!(record
        .flags
        .contains(InspectFlags::CANT_MATCH | InspectFlags::FULL_INSPECT));
}

#[test]
fn tx_and_flow_rules_combine_on_one_flow() {
    let mut rig = TestRig::http();
    let tx_sid = rig.add_sig(method_cookie_sig("GET", "session="));
    let flow_sid = rig.add_sig(
        Signature::new(SigId(0))
            .with_flow_match(TxSeen)
            .with_flow_match(CookieSeen("session=".to_string())),
    );

    assert!(rig.feed_ts("GET / HTTP/1.1\r\n").is_empty());
    let alerts = rig.feed_ts("Cookie: session=abc\r\nContent-Length: 2\r\n\r\n");

    let mut seen = sids(&alerts);
    seen.sort();
    assert_eq!(seen, vec![tx_sid, flow_sid]);
}
