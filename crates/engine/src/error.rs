// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the detection drivers.

use thiserror::Error;
use vigil_core::SigId;

/// Errors that abort the remainder of a packet's stateful inspection.
///
/// The stored state is left as it was; the affected signatures are simply
/// re-evaluated on the next packet. Missed alerts are possible on these
/// paths, false alerts are not.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("application-layer state vanished during inspection")]
    AppStateGone,
    #[error("transaction {0} vanished during inspection")]
    TxGone(u64),
    #[error("stored record references unknown signature {0}")]
    UnknownSignature(SigId),
}
