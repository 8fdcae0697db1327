// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start driver: first inspection of a candidate signature.
//!
//! Runs the signature against every transaction from the inspect-id up, then
//! the DCE/RPC payload for protocols without transactions, then the
//! flow-scoped submatch list. Where a result is not final, a continuation
//! record is persisted for the continue driver to advance on later packets.

use crate::ctx::{AlertFlags, DetectCtx, DetectEnv, Packet};
use crate::flow::{Flow, FlowLock};
use crate::registry::walk_engines;
use std::any::Any;
use tracing::{debug, error};
use vigil_applayer::{AppLayerTx, AppProto};
use vigil_core::{
    Direction, DirStateFlags, FlowMatchResult, InspectFlags, Signature, SmList, StoredFlowSig,
    TxDetectState,
};

pub(crate) fn tx_is_last(tx_id: u64, total: u64) -> bool {
    total - tx_id <= 1
}

/// Fetch the transaction's detect state, installing one if missing.
///
/// The parser advertised detect-state support; a slot that rejects the store
/// leaves the engine's bookkeeping inconsistent, which is the one condition
/// the core cannot recover from.
pub(crate) fn ensure_detect_state(tx: &mut dyn AppLayerTx) -> &mut TxDetectState {
    if tx.detect_state().is_none() {
        if tx.set_detect_state(TxDetectState::new()).is_err() {
            error!("tx detect state slot rejected the store");
            std::process::abort();
        }
        debug!("tx detect state created");
    }
    match tx.detect_state_mut() {
        Some(state) => state,
        None => {
            error!("tx detect state vanished after install");
            std::process::abort();
        }
    }
}

/// Run first-time inspection of candidate `s` on this packet's flow.
/// Returns whether the signature alerted.
pub fn start_detection(
    ctx: &mut DetectCtx,
    env: &DetectEnv<'_>,
    s: &Signature,
    p: &mut Packet,
    flow: &FlowLock,
    alproto: AppProto,
    alversion: u16,
) -> bool {
    let mut guard = flow.write();
    let f = &mut *guard;
    let alerted = {
        let mut driver = StartDriver {
            ctx: &mut *ctx,
            env: *env,
            s,
            alproto,
            alversion,
        };
        driver.run(p, f)
    };
    ctx.clear_tx_id();
    alerted
}

struct StartDriver<'a, 'e> {
    ctx: &'a mut DetectCtx,
    env: DetectEnv<'e>,
    s: &'a Signature,
    alproto: AppProto,
    alversion: u16,
}

impl StartDriver<'_, '_> {
    fn run(&mut self, p: &mut Packet, f: &mut Flow) -> bool {
        match f.alstate.as_deref() {
            None => return false,
            Some(state) if !state.is_valid() => return false,
            Some(_) => {}
        }

        let mut alerted = false;
        let mut file_no_match = 0u16;

        if self.env.parsers.supports_txs(f.proto, self.alproto) {
            alerted |= self.inspect_txs(p, f, &mut file_no_match);
        } else if self.s.has_tx_list(SmList::Dce) && self.alproto.carries_dcerpc() {
            alerted |= self.inspect_dce(p, f);
        }

        if !self.s.flow_matches().is_empty() {
            alerted |= self.inspect_flow(p, f);
        }

        alerted
    }

    /// Transactional submatchers: drive the engine table per transaction.
    fn inspect_txs(&mut self, p: &mut Packet, f: &mut Flow, file_no_match: &mut u16) -> bool {
        let dir = p.stream.direction();
        let (first, total) = match f.alstate.as_deref() {
            Some(state) => (f.parser.inspect_id(dir), state.tx_count()),
            None => return false,
        };
        let done_at = self.env.parsers.completion_status(f.proto, self.alproto, dir);
        let supports_state = self
            .env
            .parsers
            .supports_tx_detect_state(f.proto, self.alproto);
        let engines = self.env.registry.engines_for(f.proto, self.alproto, dir);
        debug!(first, total, sid = %self.s.num, "starting tx inspection");

        let mut alerted = false;
        for tx_id in first..total {
            let (walk, tx_done) = {
                let Some(alstate) = f.alstate.as_deref() else {
                    break;
                };
                let Some(tx) = alstate.tx(tx_id) else {
                    continue;
                };
                // the continue driver owns signatures that already have a
                // record on this transaction
                if tx
                    .detect_state()
                    .is_some_and(|st| st.dir(dir).sigs.contains_sig(self.s.num))
                {
                    continue;
                }
                self.ctx.tx_id = tx_id;
                self.ctx.tx_id_set = true;
                let walk = walk_engines(
                    engines,
                    self.s,
                    p.stream,
                    alstate,
                    tx,
                    tx_id,
                    InspectFlags::empty(),
                    file_no_match,
                );
                (walk, tx.progress(dir) >= done_at)
            };

            let cant = walk.flags.contains(InspectFlags::CANT_MATCH);
            let full_match = !walk.broke && walk.matches > 0;

            if full_match {
                self.ctx.alert_or_apply(
                    self.s,
                    p,
                    Some(tx_id),
                    AlertFlags::STATE_MATCH | AlertFlags::TX,
                );
                alerted = true;
            }

            // persist when there is progress to resume or a decision to
            // remember, unless the stream has already moved past this tx
            if walk.matches > 0 || cant {
                if !tx_is_last(tx_id, total) || !tx_done {
                    let mut flags = walk.flags;
                    if !walk.broke || cant {
                        flags |= InspectFlags::FULL_INSPECT;
                    }
                    self.store_tx_record(f, dir, tx_id, flags, supports_state);
                    self.settle_tx_files(f, dir, tx_id, *file_no_match, supports_state);
                } else if full_match || cant {
                    self.settle_tx_files(f, dir, tx_id, *file_no_match, supports_state);
                }
            }
        }
        alerted
    }

    fn store_tx_record(
        &mut self,
        f: &mut Flow,
        dir: Direction,
        tx_id: u64,
        flags: InspectFlags,
        supports_state: bool,
    ) {
        if !supports_state {
            return;
        }
        {
            let Some(alstate) = f.alstate.as_deref_mut() else {
                return;
            };
            let Some(tx) = alstate.tx_mut(tx_id) else {
                return;
            };
            let state = ensure_detect_state(tx);
            state.append(dir, self.s.num, flags);
        }
        f.detect_or_default().store_version(dir, self.alversion);
        debug!(tx_id, sid = %self.s.num, ?flags, "stored tx record");
    }

    /// Update the no-filestore count and turn off file storing once every
    /// filestore candidate in the group has declined.
    fn settle_tx_files(
        &mut self,
        f: &mut Flow,
        dir: Direction,
        tx_id: u64,
        file_no_match: u16,
        supports_state: bool,
    ) {
        if !supports_state {
            return;
        }
        let Some(alstate) = f.alstate.as_deref_mut() else {
            return;
        };
        let disable = {
            let Some(tx) = alstate.tx_mut(tx_id) else {
                return;
            };
            let dstate = ensure_detect_state(tx).dir_mut(dir);
            dstate.filestore_cnt += file_no_match;
            dstate.filestore_cnt == self.ctx.group_filestore_cnt
                && !dstate.flags.contains(DirStateFlags::FILE_STORE_DISABLED)
        };
        if disable {
            alstate.disable_file_store(tx_id, dir);
            if let Some(state) = alstate.tx_mut(tx_id).and_then(|t| t.detect_state_mut()) {
                state.dir_mut(dir).flags |= DirStateFlags::FILE_STORE_DISABLED;
            }
            debug!(tx_id, "file store disabled for tx");
        }
    }

    /// DCE/RPC payload: a one-shot inspection. No record is persisted, so a
    /// DCE match cannot resume across packets.
    fn inspect_dce(&mut self, p: &mut Packet, f: &mut Flow) -> bool {
        let Some(inspector) = self.env.registry.dce_inspector() else {
            return false;
        };
        let Some(alstate) = f.alstate.as_deref() else {
            return false;
        };
        let Some(dce) = alstate.dce_state() else {
            return false;
        };
        if inspector.inspect(self.s, p.stream, dce) {
            debug!(sid = %self.s.num, "dce payload matched");
            self.ctx
                .alert_or_apply(self.s, p, None, AlertFlags::STATE_MATCH);
            true
        } else {
            false
        }
    }

    /// Flow-scoped submatchers: walk the signature's flow-match list and
    /// always persist the cursor, even on a plain no-match.
    fn inspect_flow(&mut self, p: &mut Packet, f: &mut Flow) -> bool {
        let dir = p.stream.direction();
        if f.detect
            .as_ref()
            .is_some_and(|d| d.dir(dir).sigs.contains_sig(self.s.num))
        {
            return false;
        }

        let list = self.s.flow_matches();
        let mut flags = InspectFlags::empty();
        let mut cursor = 0usize;
        let mut last = FlowMatchResult::Pending;
        {
            let Some(alstate) = f.alstate.as_deref() else {
                return false;
            };
            let target: Option<&dyn Any> = match self.alproto {
                AppProto::Smb | AppProto::Smb2 => alstate.dce_state(),
                _ => Some(alstate.as_any()),
            };
            while cursor < list.len() {
                let Some(state) = target else {
                    break;
                };
                last = list[cursor].app_layer_match(p.stream, state, self.s);
                match last {
                    FlowMatchResult::Match => cursor += 1,
                    FlowMatchResult::Pending => break,
                    FlowMatchResult::CantMatch => {
                        flags |= InspectFlags::CANT_MATCH;
                        break;
                    }
                }
            }
        }

        let exhausted = cursor >= list.len();
        let mut alerted = false;
        if exhausted || flags.contains(InspectFlags::CANT_MATCH) {
            if exhausted && last == FlowMatchResult::Match {
                self.ctx
                    .alert_or_apply(self.s, p, None, AlertFlags::STATE_MATCH);
                alerted = true;
            }
            flags |= InspectFlags::FULL_INSPECT;
        }

        let record = StoredFlowSig {
            sid: self.s.num,
            flags,
            cursor: if exhausted { None } else { Some(cursor) },
        };
        let detect = f.detect_or_default();
        detect.append(dir, record);
        detect.store_version(dir, self.alversion);
        debug!(sid = %self.s.num, ?flags, cursor = ?record.cursor, "stored flow record");
        alerted
    }
}

#[cfg(test)]
#[path = "start_tests.rs"]
mod tests;
