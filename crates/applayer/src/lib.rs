// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-applayer: the application-layer parser capability set consumed by
//! the detection core, plus the flow's parser-side inspection bookkeeping.

pub mod parser;
pub mod proto;
pub mod state;

pub use parser::ParserState;
pub use proto::{AppProto, IpProto, ParserRegistry, ProtoCaps};
pub use state::{AppLayerState, AppLayerTx, StateError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake_http;
#[cfg(any(test, feature = "test-support"))]
pub use fake_http::{FakeFile, FakeHttpState, FakeHttpTx};
