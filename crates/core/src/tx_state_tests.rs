// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn append_lands_in_requested_direction() {
    let mut state = TxDetectState::new();
    state.append(Direction::ToServer, SigId(1), InspectFlags::METHOD);

    assert_eq!(state.dir(Direction::ToServer).sigs.len(), 1);
    assert!(state.dir(Direction::ToClient).sigs.is_empty());
}

#[test]
fn new_file_flag_set_and_cleared_per_direction() {
    let mut state = TxDetectState::new();
    state.on_new_file(Direction::ToServer);

    assert!(state
        .dir(Direction::ToServer)
        .flags
        .contains(DirStateFlags::FILE_TS_NEW));
    assert!(state.dir(Direction::ToClient).flags.is_empty());

    state.clear_new_file(Direction::ToServer);
    assert!(state.dir(Direction::ToServer).flags.is_empty());
}

#[test]
fn reset_honors_direction_mask() {
    let mut state = TxDetectState::new();
    state.append(Direction::ToServer, SigId(1), InspectFlags::empty());
    state.append(Direction::ToClient, SigId(2), InspectFlags::empty());
    state.dir_mut(Direction::ToServer).filestore_cnt = 2;

    state.reset(StreamFlags::TO_SERVER);

    assert!(state.dir(Direction::ToServer).sigs.is_empty());
    assert_eq!(state.dir(Direction::ToServer).filestore_cnt, 0);
    assert_eq!(state.dir(Direction::ToClient).sigs.len(), 1);

    state.reset(StreamFlags::TO_SERVER | StreamFlags::TO_CLIENT);
    assert!(state.dir(Direction::ToClient).sigs.is_empty());
}
