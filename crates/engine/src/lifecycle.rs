// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle operations: the pre-check before the continue driver,
//! inspect-id advancement, and the reset paths.

use crate::flow::{Flow, FlowLock};
use std::cmp::min;
use tracing::debug;
use vigil_applayer::ParserRegistry;
use vigil_core::{Direction, StreamFlags};

/// Outcome of the pre-check before running the continue driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectableState {
    /// Nothing stored for this direction.
    Nothing,
    /// Stored state exists and the app layer has advanced.
    New,
    /// Stored state exists but nothing changed since the last inspection;
    /// skip unless the stream hit EOF.
    Unchanged,
}

/// Is there anything for the continue driver to do on this flow?
pub fn has_inspectable_state(
    flow: &FlowLock,
    parsers: &ParserRegistry,
    alversion: u16,
    stream: StreamFlags,
) -> InspectableState {
    let f = flow.read();
    let dir = stream.direction();
    if !stream.contains(StreamFlags::EOF)
        && f.detect
            .as_ref()
            .is_some_and(|d| d.last_version(dir) == alversion)
    {
        debug!("state unchanged since last inspection");
        return InspectableState::Unchanged;
    }
    if has_stored_sigs(&f, parsers, dir) {
        InspectableState::New
    } else {
        InspectableState::Nothing
    }
}

fn has_stored_sigs(f: &Flow, parsers: &ParserRegistry, dir: Direction) -> bool {
    if f.detect.as_ref().is_some_and(|d| !d.dir(dir).sigs.is_empty()) {
        debug!("flow-scoped sigs present");
        return true;
    }
    if parsers.supports_txs(f.proto, f.alproto) {
        let Some(alstate) = f.alstate.as_deref() else {
            return false;
        };
        if !alstate.is_valid() {
            return false;
        }
        let total = alstate.tx_count();
        for tx_id in f.parser.inspect_id(dir)..total {
            let stored = alstate
                .tx(tx_id)
                .and_then(|tx| tx.detect_state())
                .is_some_and(|state| !state.dir(dir).sigs.is_empty());
            if stored {
                debug!(tx_id, "tx has sigs present");
                return true;
            }
        }
    }
    false
}

/// Advance the flow's inspect-id past completed transactions in `dir`.
pub fn update_inspect_tx_id(flow: &FlowLock, parsers: &ParserRegistry, dir: Direction) {
    let mut guard = flow.write();
    let f = &mut *guard;
    let Some(alstate) = f.alstate.as_deref() else {
        return;
    };
    let Some(caps) = parsers.caps(f.proto, f.alproto) else {
        return;
    };
    f.parser.set_inspect_id(caps, alstate, dir);
}

/// Zero the detect state of every live transaction, both directions. Used
/// on engine reload so the new signature set starts from a clean slate.
/// Caller holds the flow write lock.
pub fn reset_txs(f: &mut Flow, parsers: &ParserRegistry) {
    if !parsers.supports_txs(f.proto, f.alproto) {
        return;
    }
    let first = min(
        f.parser.inspect_id(Direction::ToServer),
        f.parser.inspect_id(Direction::ToClient),
    );
    let Some(alstate) = f.alstate.as_deref_mut() else {
        return;
    };
    if !alstate.is_valid() {
        return;
    }
    let total = alstate.tx_count();
    for tx_id in first..total {
        if let Some(state) = alstate.tx_mut(tx_id).and_then(|tx| tx.detect_state_mut()) {
            state.reset(StreamFlags::TO_SERVER | StreamFlags::TO_CLIENT);
        }
    }
}

/// Acknowledge the new-file signals for `dir` on live transactions, once
/// the direction's continue pass has run. Caller holds the flow write lock.
pub fn clear_new_file_flags(f: &mut Flow, parsers: &ParserRegistry, dir: Direction) {
    if !parsers.supports_txs(f.proto, f.alproto) {
        return;
    }
    let first = f.parser.inspect_id(dir);
    let Some(alstate) = f.alstate.as_deref_mut() else {
        return;
    };
    let total = alstate.tx_count();
    for tx_id in first..total {
        if let Some(state) = alstate.tx_mut(tx_id).and_then(|tx| tx.detect_state_mut()) {
            state.clear_new_file(dir);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
