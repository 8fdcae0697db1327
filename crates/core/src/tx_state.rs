// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detect state owned by one application-layer transaction.

use crate::direction::{Direction, StreamFlags};
use crate::flags::{DirStateFlags, InspectFlags};
use crate::sig::SigId;
use crate::store::{reset_masked, DirState, StoredSig};

/// Per-transaction match progress for stateful signatures, one record store
/// per direction.
///
/// Allocated lazily by the start driver the first time it has something to
/// persist for a transaction, stored in the transaction's detect-state slot,
/// and freed by the owning parser when the transaction is freed. Mutated
/// only under the flow lock.
#[derive(Debug, Default)]
pub struct TxDetectState {
    dir: [DirState<StoredSig>; 2],
}

impl TxDetectState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(&self, dir: Direction) -> &DirState<StoredSig> {
        &self.dir[dir.index()]
    }

    pub fn dir_mut(&mut self, dir: Direction) -> &mut DirState<StoredSig> {
        &mut self.dir[dir.index()]
    }

    pub fn append(&mut self, dir: Direction, sid: SigId, flags: InspectFlags) {
        self.dir[dir.index()].sigs.append(StoredSig { sid, flags });
    }

    /// Called by the owning parser when a new file opens mid-transaction.
    /// Makes records that already consumed files in `dir` eligible to re-run.
    pub fn on_new_file(&mut self, dir: Direction) {
        self.dir[dir.index()].flags |= DirStateFlags::file_new(dir);
    }

    /// Acknowledge the new-file signal once the direction has been
    /// re-inspected.
    pub fn clear_new_file(&mut self, dir: Direction) {
        self.dir[dir.index()].flags -= DirStateFlags::file_new(dir);
    }

    /// Forget all records and counters for the directions in `dirs`.
    pub fn reset(&mut self, dirs: StreamFlags) {
        reset_masked(&mut self.dir, dirs);
    }
}

#[cfg(test)]
#[path = "tx_state_tests.rs"]
mod tests;
