// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traits the detection core uses to look into reassembled app-layer state.

use std::any::Any;
use thiserror::Error;
use vigil_core::{Direction, TxDetectState};

/// Errors from the transaction detect-state slot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("transaction has no detect state slot")]
    NoDetectStateSlot,
}

/// One application-layer transaction as seen by the detection core.
///
/// The core never interprets transaction contents itself; protocol-specific
/// inspection engines downcast through [`AppLayerTx::as_any`].
pub trait AppLayerTx {
    /// Parser progress for `dir`, compared against the protocol's completion
    /// status to decide whether the transaction is done.
    fn progress(&self, dir: Direction) -> i32;

    fn detect_state(&self) -> Option<&TxDetectState>;

    fn detect_state_mut(&mut self) -> Option<&mut TxDetectState>;

    /// Install the detect state for this transaction. Must not fail for
    /// protocols that advertise `supports_tx_detect_state`.
    fn set_detect_state(&mut self, state: TxDetectState) -> Result<(), StateError>;

    fn as_any(&self) -> &dyn Any;
}

/// Reassembled application-layer state for one flow.
pub trait AppLayerState: Send {
    /// False when the parser allocated state but it is unusable (e.g. an
    /// HTTP state without a connection); the drivers bail out early.
    fn is_valid(&self) -> bool {
        true
    }

    /// Total transactions seen so far; ids are dense in `0..tx_count()`.
    fn tx_count(&self) -> u64;

    fn tx(&self, tx_id: u64) -> Option<&dyn AppLayerTx>;

    fn tx_mut(&mut self, tx_id: u64) -> Option<&mut dyn AppLayerTx>;

    /// The DCE/RPC state to run DCE submatches against: the nested sub-state
    /// for SMB carriers (when present), the state itself for plain DCE/RPC,
    /// `None` otherwise.
    fn dce_state(&self) -> Option<&dyn Any> {
        None
    }

    /// Stop storing files for `tx_id` in `dir`. Files already flagged for
    /// storing are left alone.
    fn disable_file_store(&mut self, tx_id: u64, dir: Direction) {
        let _ = (tx_id, dir);
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
