// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inspection-engine table.
//!
//! One engine evaluates one submatch list of a signature against one
//! transaction. Engines are registered per transport/app-protocol/direction
//! at init time; the table is immutable afterwards and shared read-only by
//! all workers.

use std::any::Any;
use std::collections::HashMap;
use vigil_applayer::{AppLayerState, AppLayerTx, AppProto, IpProto};
use vigil_core::{Direction, InspectFlags, Signature, SmList, StreamFlags};

/// Verdict of one engine run for one signature on one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectResult {
    Match,
    /// Undecided; more data may change the answer.
    NoMatch,
    /// Can never match on this transaction.
    CantMatch,
    /// As `CantMatch`, and the signature was a filestore candidate.
    CantMatchFilestore,
}

/// A protocol-specific evaluator for one submatch list.
pub trait TxInspect: Send + Sync {
    fn inspect(
        &self,
        s: &Signature,
        stream: StreamFlags,
        state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        tx_id: u64,
    ) -> InspectResult;
}

/// The DCE/RPC payload inspector used for protocols without transactions.
pub trait DceInspect: Send + Sync {
    fn inspect(&self, s: &Signature, stream: StreamFlags, dce: &dyn Any) -> bool;
}

/// One entry in the engine table.
pub struct InspectEngine {
    /// The submatch list this engine consumes; signatures without it are
    /// skipped.
    pub sm_list: SmList,
    /// The inspected-bit recorded once this engine has run for a signature
    /// on a transaction.
    pub flag: InspectFlags,
    inspector: Box<dyn TxInspect>,
}

impl InspectEngine {
    pub fn new(sm_list: SmList, flag: InspectFlags, inspector: impl TxInspect + 'static) -> Self {
        Self {
            sm_list,
            flag,
            inspector: Box::new(inspector),
        }
    }

    pub fn inspect(
        &self,
        s: &Signature,
        stream: StreamFlags,
        state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        tx_id: u64,
    ) -> InspectResult {
        self.inspector.inspect(s, stream, state, tx, tx_id)
    }
}

/// Lookup service for inspection engines, keyed like the flow is.
#[derive(Default)]
pub struct EngineRegistry {
    engines: HashMap<(IpProto, AppProto, Direction), Vec<InspectEngine>>,
    dce: Option<Box<dyn DceInspect>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an engine; evaluation order follows registration order.
    pub fn register(
        &mut self,
        proto: IpProto,
        alproto: AppProto,
        dir: Direction,
        engine: InspectEngine,
    ) {
        self.engines
            .entry((proto, alproto, dir))
            .or_default()
            .push(engine);
    }

    pub fn set_dce_inspector(&mut self, inspector: impl DceInspect + 'static) {
        self.dce = Some(Box::new(inspector));
    }

    pub fn engines_for(&self, proto: IpProto, alproto: AppProto, dir: Direction) -> &[InspectEngine] {
        self.engines
            .get(&(proto, alproto, dir))
            .map_or(&[], Vec::as_slice)
    }

    pub fn dce_inspector(&self) -> Option<&dyn DceInspect> {
        self.dce.as_deref()
    }
}

/// Outcome of walking the engine list once for one signature on one
/// transaction.
pub(crate) struct EngineWalk {
    pub flags: InspectFlags,
    pub matches: u32,
    /// True when the walk stopped before exhausting the engine list.
    pub broke: bool,
}

/// Run every applicable engine until one fails to match. Engines whose
/// inspected-bit is already present in `skip` are not re-run.
#[allow(clippy::too_many_arguments)]
pub(crate) fn walk_engines(
    engines: &[InspectEngine],
    s: &Signature,
    stream: StreamFlags,
    alstate: &dyn AppLayerState,
    tx: &dyn AppLayerTx,
    tx_id: u64,
    skip: InspectFlags,
    file_no_match: &mut u16,
) -> EngineWalk {
    let mut walk = EngineWalk {
        flags: InspectFlags::empty(),
        matches: 0,
        broke: false,
    };
    for engine in engines {
        if skip.contains(engine.flag) || !s.has_tx_list(engine.sm_list) {
            continue;
        }
        match engine.inspect(s, stream, alstate, tx, tx_id) {
            InspectResult::Match => {
                walk.flags |= engine.flag;
                walk.matches += 1;
            }
            InspectResult::NoMatch => {
                walk.broke = true;
                break;
            }
            InspectResult::CantMatch => {
                walk.flags |= InspectFlags::CANT_MATCH | engine.flag;
                walk.broke = true;
                break;
            }
            InspectResult::CantMatchFilestore => {
                walk.flags |= InspectFlags::CANT_MATCH | engine.flag;
                *file_no_match += 1;
                walk.broke = true;
                break;
            }
        }
    }
    walk
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
