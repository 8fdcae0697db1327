// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continue driver: advance previously-stored records.
//!
//! Walks every record the start driver persisted, re-running only the
//! engines whose inspected-bit is not yet set, and resuming flow-scoped
//! submatch walks from their stored cursor. Records that can produce no
//! further state are marked so the outer rule loop skips their signatures.

use crate::ctx::{AlertFlags, DetectCtx, DetectEnv, Packet};
use crate::error::DetectError;
use crate::flow::{Flow, FlowLock};
use crate::registry::walk_engines;
use crate::start::tx_is_last;
use std::any::Any;
use tracing::{debug, trace};
use vigil_applayer::AppProto;
use vigil_core::{
    Direction, DirStateFlags, FlowMatchResult, InspectFlags, MatchProgress, StoredSig, StreamFlags,
};

/// Advance all stored records for this packet's direction. Alerts and
/// `NoNewState` markings are side effects on `ctx`; an error aborts the
/// remainder of this packet's stateful inspection.
pub fn continue_detection(
    ctx: &mut DetectCtx,
    env: &DetectEnv<'_>,
    p: &mut Packet,
    flow: &FlowLock,
    alproto: AppProto,
    alversion: u16,
) -> Result<(), DetectError> {
    let mut guard = flow.write();
    let f = &mut *guard;
    let result = {
        let mut driver = ContinueDriver {
            ctx: &mut *ctx,
            env: *env,
            alproto,
            alversion,
        };
        driver.run(p, f)
    };
    ctx.clear_tx_id();
    result
}

struct ContinueDriver<'a, 'e> {
    ctx: &'a mut DetectCtx,
    env: DetectEnv<'e>,
    alproto: AppProto,
    alversion: u16,
}

struct TxInfo {
    tx_id: u64,
    total: u64,
    inprogress: bool,
    /// The following transaction exists but has made no progress yet.
    next_dormant: bool,
    record_cnt: u32,
    dir_flags: DirStateFlags,
}

impl ContinueDriver<'_, '_> {
    fn run(&mut self, p: &mut Packet, f: &mut Flow) -> Result<(), DetectError> {
        let dir = p.stream.direction();
        let mut file_no_match = 0u16;

        if self.env.parsers.supports_txs(f.proto, self.alproto) {
            self.advance_txs(p, f, dir, &mut file_no_match)?;
        }

        if f.detect.is_some() {
            let cnt = f.detect.as_ref().map_or(0, |d| d.dir(dir).sigs.len());
            for idx in 0..cnt {
                self.advance_flow_record(p, f, dir, idx)?;
            }
        }

        if file_no_match > 0 {
            trace!(file_no_match, "file no-match verdicts this pass");
        }

        // record the version so unchanged state can be skipped next packet
        f.detect_or_default().store_version(dir, self.alversion);
        Ok(())
    }

    fn advance_txs(
        &mut self,
        p: &mut Packet,
        f: &mut Flow,
        dir: Direction,
        file_no_match: &mut u16,
    ) -> Result<(), DetectError> {
        let (first, total) = {
            let Some(alstate) = f.alstate.as_deref() else {
                return Ok(());
            };
            if !alstate.is_valid() {
                return Ok(());
            }
            (f.parser.inspect_id(dir), alstate.tx_count())
        };
        let done_at = self.env.parsers.completion_status(f.proto, self.alproto, dir);

        for tx_id in first..total {
            let Some(info) = tx_info(f, dir, tx_id, total, done_at) else {
                continue;
            };
            if info.record_cnt == 0 {
                continue;
            }
            debug!(
                tx_id,
                total,
                inprogress = info.inprogress,
                records = info.record_cnt,
                "advancing tx records"
            );
            for idx in 0..info.record_cnt {
                self.advance_tx_record(p, f, dir, &info, idx, file_no_match)?;
            }
            // later transactions cannot be advanced past one still in
            // progress
            if info.inprogress {
                debug!(tx_id, "tx in progress, halting walk");
                break;
            }
        }
        Ok(())
    }

    fn advance_tx_record(
        &mut self,
        p: &mut Packet,
        f: &mut Flow,
        dir: Direction,
        info: &TxInfo,
        idx: u32,
        file_no_match: &mut u16,
    ) -> Result<(), DetectError> {
        let Some(item) = read_tx_record(f, dir, info.tx_id, idx) else {
            return Ok(());
        };
        let env = self.env;
        let Some(s) = env.sigs.get(item.sid) else {
            return Err(DetectError::UnknownSignature(item.sid));
        };

        let stream = p.stream;
        let mut flags = item.flags;
        let halt_here = tx_is_last(info.tx_id, info.total) || info.inprogress || info.next_dormant;
        let mut alert = false;

        'inspect: {
            // a full-inspected record is reconsidered when a new file
            // arrived on the side it consumed files from
            if flags.contains(InspectFlags::FULL_INSPECT) {
                if flags.intersects(InspectFlags::FILE_TS | InspectFlags::FILE_TC) {
                    if stream.contains(StreamFlags::TO_CLIENT)
                        && info.dir_flags.contains(DirStateFlags::FILE_TC_NEW)
                    {
                        flags -= InspectFlags::FILE_TC | InspectFlags::FULL_INSPECT;
                        debug!(sid = %item.sid, "new to-client file reopens record");
                    }
                    if stream.contains(StreamFlags::TO_SERVER)
                        && info.dir_flags.contains(DirStateFlags::FILE_TS_NEW)
                    {
                        flags -= InspectFlags::FILE_TS | InspectFlags::FULL_INSPECT;
                        debug!(sid = %item.sid, "new to-server file reopens record");
                    }
                }
                if flags.contains(InspectFlags::FULL_INSPECT) {
                    if halt_here {
                        self.ctx.set_progress(item.sid, MatchProgress::NoNewState);
                    }
                    break 'inspect;
                }
            }

            // same carve-out for records proven unable to match
            if flags.contains(InspectFlags::CANT_MATCH) {
                let reopened = if stream.contains(StreamFlags::TO_SERVER)
                    && flags.contains(InspectFlags::FILE_TS)
                    && info.dir_flags.contains(DirStateFlags::FILE_TS_NEW)
                {
                    flags -= InspectFlags::FILE_TS | InspectFlags::CANT_MATCH;
                    true
                } else if stream.contains(StreamFlags::TO_CLIENT)
                    && flags.contains(InspectFlags::FILE_TC)
                    && info.dir_flags.contains(DirStateFlags::FILE_TC_NEW)
                {
                    flags -= InspectFlags::FILE_TC | InspectFlags::CANT_MATCH;
                    true
                } else {
                    false
                };
                if !reopened {
                    if halt_here {
                        self.ctx.set_progress(item.sid, MatchProgress::NoNewState);
                    }
                    break 'inspect;
                }
            }

            let walk = {
                let Some(alstate) = f.alstate.as_deref() else {
                    return Err(DetectError::AppStateGone);
                };
                if !alstate.is_valid() {
                    return Err(DetectError::AppStateGone);
                }
                let Some(tx) = alstate.tx(info.tx_id) else {
                    return Err(DetectError::TxGone(info.tx_id));
                };
                self.ctx.tx_id = info.tx_id;
                self.ctx.tx_id_set = true;
                let engines = env.registry.engines_for(f.proto, self.alproto, dir);
                walk_engines(
                    engines,
                    s,
                    stream,
                    alstate,
                    tx,
                    info.tx_id,
                    flags,
                    file_no_match,
                )
            };

            flags |= walk.flags;
            if walk.matches > 0 && (!walk.broke || flags.contains(InspectFlags::CANT_MATCH)) {
                if !walk.broke {
                    alert = true;
                }
                flags |= InspectFlags::FULL_INSPECT;
            }
            if tx_is_last(info.tx_id, info.total) {
                self.ctx.set_progress(item.sid, MatchProgress::NoNewState);
            }
        }

        if flags != item.flags {
            write_tx_record_flags(f, dir, info.tx_id, idx, flags);
        }
        if alert {
            self.ctx.alert_or_apply(
                s,
                p,
                Some(info.tx_id),
                AlertFlags::STATE_MATCH | AlertFlags::TX,
            );
        }
        Ok(())
    }

    /// Resume one flow-scoped record from its stored cursor.
    fn advance_flow_record(
        &mut self,
        p: &mut Packet,
        f: &mut Flow,
        dir: Direction,
        idx: u32,
    ) -> Result<(), DetectError> {
        let Some(item) = f
            .detect
            .as_ref()
            .and_then(|d| d.dir(dir).sigs.get(idx))
            .copied()
        else {
            return Ok(());
        };

        // settled records only feed the prefilter skip list
        if item
            .flags
            .intersects(InspectFlags::FULL_INSPECT | InspectFlags::CANT_MATCH)
        {
            self.ctx.set_progress(item.sid, MatchProgress::NoNewState);
            return Ok(());
        }

        let env = self.env;
        let Some(s) = env.sigs.get(item.sid) else {
            return Err(DetectError::UnknownSignature(item.sid));
        };

        let mut flags = item.flags;
        let mut cursor = item.cursor;
        let mut matches_found = 0u32;

        if let Some(start_at) = item.cursor {
            let Some(alstate) = f.alstate.as_deref() else {
                return Err(DetectError::AppStateGone);
            };
            let target: Option<&dyn Any> = match self.alproto {
                AppProto::Smb | AppProto::Smb2 => alstate.dce_state(),
                _ => Some(alstate.as_any()),
            };
            let list = s.flow_matches();
            let mut i = start_at;
            while i < list.len() {
                let Some(state) = target else {
                    break;
                };
                match list[i].app_layer_match(p.stream, state, s) {
                    FlowMatchResult::Pending => break,
                    FlowMatchResult::CantMatch => {
                        flags |= InspectFlags::CANT_MATCH;
                        i += 1;
                    }
                    FlowMatchResult::Match => {
                        matches_found += 1;
                        i += 1;
                    }
                }
            }
            cursor = if i < list.len() { Some(i) } else { None };
        }

        let mut alert = false;
        if !s.flow_matches().is_empty() {
            let exhausted = cursor.is_none();
            if matches_found > 0 && (exhausted || flags.contains(InspectFlags::CANT_MATCH)) {
                if exhausted {
                    alert = true;
                }
                flags |= InspectFlags::FULL_INSPECT;
            }
            // the cursor has advanced; further progress waits for new data
            self.ctx.set_progress(item.sid, MatchProgress::NoNewState);
        }

        if let Some(slot) = f.detect.as_mut().and_then(|d| d.dir_mut(dir).sigs.get_mut(idx)) {
            slot.flags = flags;
            slot.cursor = cursor;
        }
        if alert {
            self.ctx.alert_or_apply(s, p, None, AlertFlags::STATE_MATCH);
        }
        Ok(())
    }
}

fn tx_info(f: &Flow, dir: Direction, tx_id: u64, total: u64, done_at: i32) -> Option<TxInfo> {
    let alstate = f.alstate.as_deref()?;
    let tx = alstate.tx(tx_id)?;
    let inprogress = tx.progress(dir) < done_at;
    let (record_cnt, dir_flags) = match tx.detect_state() {
        Some(state) => (state.dir(dir).sigs.len(), state.dir(dir).flags),
        None => (0, DirStateFlags::empty()),
    };
    let next_dormant = if !tx_is_last(tx_id, total) {
        alstate
            .tx(tx_id + 1)
            .is_some_and(|next| next.progress(dir) == 0)
    } else {
        false
    };
    Some(TxInfo {
        tx_id,
        total,
        inprogress,
        next_dormant,
        record_cnt,
        dir_flags,
    })
}

fn read_tx_record(f: &Flow, dir: Direction, tx_id: u64, idx: u32) -> Option<StoredSig> {
    f.alstate
        .as_deref()?
        .tx(tx_id)?
        .detect_state()?
        .dir(dir)
        .sigs
        .get(idx)
        .copied()
}

fn write_tx_record_flags(f: &mut Flow, dir: Direction, tx_id: u64, idx: u32, flags: InspectFlags) {
    let slot = f
        .alstate
        .as_deref_mut()
        .and_then(|st| st.tx_mut(tx_id))
        .and_then(|tx| tx.detect_state_mut())
        .and_then(|state| state.dir_mut(dir).sigs.get_mut(idx));
    if let Some(slot) = slot {
        slot.flags = flags;
    }
}

#[cfg(test)]
#[path = "resume_tests.rs"]
mod tests;
