// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The slice of a tracked flow the detection core works on.

use parking_lot::RwLock;
use vigil_applayer::{AppLayerState, AppProto, IpProto, ParserState};
use vigil_core::FlowDetectState;

/// One tracked flow.
///
/// `detect` holds the flow-scoped records and the per-direction app-layer
/// version of the last inspection; it is allocated lazily the first time a
/// driver has something to persist.
pub struct Flow {
    pub proto: IpProto,
    pub alproto: AppProto,
    /// Reassembled app-layer state, owned by the flow. `None` until the
    /// parser has produced anything.
    pub alstate: Option<Box<dyn AppLayerState>>,
    /// Parser-side inspection ids.
    pub parser: ParserState,
    pub detect: Option<Box<FlowDetectState>>,
}

impl Flow {
    pub fn new(proto: IpProto, alproto: AppProto) -> Self {
        Self {
            proto,
            alproto,
            alstate: None,
            parser: ParserState::new(),
            detect: None,
        }
    }

    pub(crate) fn detect_or_default(&mut self) -> &mut FlowDetectState {
        self.detect.get_or_insert_with(Box::default)
    }
}

/// The per-flow write lock. Worker threads serialize on it; a driver call
/// holds it for its entire duration, and submatch callbacks run under it, so
/// they must never block.
pub type FlowLock = RwLock<Flow>;
