// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-core: data model for the Vigil stateful detection core

pub mod direction;
pub mod flags;
pub mod flow_state;
pub mod sig;
pub mod store;
pub mod tx_state;

pub use direction::{Direction, StreamFlags};
pub use flags::{DirStateFlags, InspectFlags};
pub use flow_state::FlowDetectState;
pub use sig::{
    Action, FlowMatch, FlowMatchResult, MatchProgress, SigFlags, SigId, Signature, SmList,
};
pub use store::{DirState, SigRecord, SigStore, StoredFlowSig, StoredSig, CHUNK_SIZE};
pub use tx_state::TxDetectState;
