// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateful HTTP matching across chunk boundaries and pipelined
//! transactions.

use crate::prelude::*;
use vigil_core::InspectFlags;

#[test]
fn single_chunk_partial_match_persists_but_does_not_alert() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(method_cookie_sig("POST", "dummy"));

    let alerts = rig.feed_ts("POST / HTTP/1.0\r\n");

    assert!(alerts.is_empty());
    // one record on tx 0, to-server side, waiting for the cookie
    assert_eq!(rig.tx_record_count(0), 1);
    let record = rig.tx_record(0, 0).unwrap();
    assert_eq!(record.sid, sid);
    assert!(record.flags.contains(InspectFlags::METHOD));
    assert!(!record.flags.contains(InspectFlags::FULL_INSPECT));
}

#[test]
fn multi_chunk_request_alerts_exactly_once() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(method_cookie_sig("POST", "dummy"));

    assert!(rig.feed_ts("POST / HTTP/1.0\r\n").is_empty());
    assert!(rig.feed_ts("User-Agent: Mozilla/1.0\r\n").is_empty());

    let alerts = rig.feed_ts("Cookie: dummy\r\nContent-Length: 10\r\n\r\n");
    assert_eq!(sids(&alerts), vec![sid]);
    assert_eq!(alerts[0].tx_id, Some(0));

    // the body chunk must not re-alert
    assert!(rig.feed_ts("Http Body!").is_empty());
}

#[test]
fn pipelined_transactions_do_not_cross_match() {
    let mut rig = TestRig::http();
    let sid1 = rig.add_sig(method_header_cookie_sig("POST", "Mozilla", "dummy"));
    let sid2 = rig.add_sig(method_header_cookie_sig("GET", "Firefox", "dummy2"));

    // transaction 0: the POST request
    assert!(rig.feed_ts("POST / HTTP/1.1\r\n").is_empty());
    assert!(rig
        .feed_ts("User-Agent: Mozilla/1.0\r\nContent-Length: 10\r\n")
        .is_empty());
    let alerts = rig.feed_ts("Cookie: dummy\r\n\r\n");
    assert_eq!(sids(&alerts), vec![sid1]);
    assert_eq!(alerts[0].tx_id, Some(0));
    assert!(rig.feed_ts("Http Body!").is_empty());

    // transaction 1: the pipelined GET request
    assert!(rig.feed_ts("GET /?var=val HTTP/1.1\r\n").is_empty());
    assert!(rig.feed_ts("User-Agent: Firefox/1.0\r\n").is_empty());
    let alerts = rig.feed_ts("Cookie: dummy2\r\nContent-Length: 10\r\n\r\nHttp Body!");
    assert_eq!(sids(&alerts), vec![sid2]);
    assert_eq!(alerts[0].tx_id, Some(1));
}

#[test]
fn header_only_match_waits_for_all_lists() {
    let mut rig = TestRig::http();
    rig.add_sig(method_header_cookie_sig("POST", "Mozilla", "dummy"));

    assert!(rig.feed_ts("POST / HTTP/1.1\r\n").is_empty());
    // the header matches here, but the cookie is still outstanding
    assert!(rig.feed_ts("User-Agent: Mozilla/1.0\r\n").is_empty());
    // headers close without the cookie: the signature can no longer match
    let alerts = rig.feed_ts("Content-Length: 10\r\n\r\nHttp Body!");
    assert!(alerts.is_empty());

    let record = rig.tx_record(0, 0).unwrap();
    assert!(record.flags.contains(InspectFlags::CANT_MATCH));
}
