// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-engine: stateful signature inspection drivers.
//!
//! The stateless matcher decides that a signature is a candidate on a
//! packet; this crate owns everything after that. [`start_detection`] runs
//! the first inspection of a candidate against the flow's transactions and
//! flow-scoped submatches and persists continuation records;
//! [`continue_detection`] advances those records as more reassembled data
//! arrives. All state is reached through the flow write lock, held for the
//! whole duration of a driver call.

mod ctx;
mod error;
mod flow;
mod lifecycle;
mod registry;
mod resume;
mod start;

pub use ctx::{Alert, AlertFlags, DetectCtx, DetectEnv, Packet, SigTable};
pub use error::DetectError;
pub use flow::{Flow, FlowLock};
pub use lifecycle::{
    clear_new_file_flags, has_inspectable_state, reset_txs, update_inspect_tx_id, InspectableState,
};
pub use registry::{DceInspect, EngineRegistry, InspectEngine, InspectResult, TxInspect};
pub use resume::continue_detection;
pub use start::start_detection;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
pub mod fake;
