// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-handling side effects: the filestore action, and disabling file
//! storage once every filestore candidate has declined.

use crate::prelude::*;
use vigil_core::StreamFlags;

#[test]
fn matching_filestore_sig_enables_store() {
    let mut rig = TestRig::http();
    let sid = rig.add_sig(upload_sig("POST", "upload.cgi", None, true));

    let alerts = rig.feed(&upload_request(), StreamFlags::START | StreamFlags::EOF);

    assert_eq!(sids(&alerts), vec![sid]);
    let file = rig.file(0).unwrap();
    assert_eq!(file.filename, "somepicture1.jpg");
    assert!(file.store);
    assert!(!file.nostore);
}

#[test]
fn non_matching_filestore_sig_disables_store() {
    let mut rig = TestRig::http();
    rig.add_sig(upload_sig("GET", "upload.cgi", None, true));

    let alerts = rig.feed(&upload_request(), StreamFlags::START | StreamFlags::EOF);

    assert!(alerts.is_empty());
    let file = rig.file(0).unwrap();
    assert!(file.nostore);
    assert!(!file.store);
}

#[test]
fn filename_mismatch_disables_store() {
    let mut rig = TestRig::http();
    rig.add_sig(upload_sig("POST", "upload.cgi", Some("nomatch"), true));

    let alerts = rig.feed(&upload_request(), StreamFlags::START | StreamFlags::EOF);

    assert!(alerts.is_empty());
    let file = rig.file(0).unwrap();
    assert!(file.nostore);
    assert!(!file.store);
}

#[test]
fn filename_sig_without_filestore_still_marks_no_store() {
    let mut rig = TestRig::http();
    rig.add_sig(upload_sig("GET", "upload.cgi", Some("nomatch"), false));

    let alerts = rig.feed(&upload_request(), StreamFlags::START | StreamFlags::EOF);

    assert!(alerts.is_empty());
    let file = rig.file(0).unwrap();
    assert!(file.nostore);
}

#[test]
fn split_upload_stays_unstored_for_non_matching_sig() {
    let mut rig = TestRig::http();
    rig.add_sig(upload_sig("GET", "upload.cgi", None, true));

    let request = upload_request();
    let split_at = request.find("filecontent").unwrap();

    let alerts = rig.feed(&request[..split_at], StreamFlags::START);
    assert!(alerts.is_empty());

    let alerts = rig.feed(&request[split_at..], StreamFlags::EOF);
    assert!(alerts.is_empty());

    let file = rig.file(0).unwrap();
    assert!(!file.store);
    assert!(file.nostore);
}
