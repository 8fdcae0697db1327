// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker detection context, the packet view, and the alert queue.

use crate::registry::EngineRegistry;
use bitflags::bitflags;
use serde::Serialize;
use vigil_applayer::ParserRegistry;
use vigil_core::{Action, MatchProgress, SigFlags, SigId, Signature, StreamFlags};

bitflags! {
    /// Qualifiers attached to a queued alert.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct AlertFlags: u8 {
        /// Produced by stateful inspection rather than a single packet.
        const STATE_MATCH = 1 << 0;
        /// Scoped to one transaction; `tx_id` is meaningful.
        const TX = 1 << 1;
    }
}

/// One queued alert, consumed by the enclosing engine's output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub sid: SigId,
    pub tx_id: Option<u64>,
    pub flags: AlertFlags,
}

/// What the core reads and writes on a packet.
#[derive(Debug, Clone, Copy)]
pub struct Packet {
    pub stream: StreamFlags,
    /// Actions accumulated by silently-matching signatures.
    pub action: Action,
}

impl Packet {
    pub fn new(stream: StreamFlags) -> Self {
        Self {
            stream,
            action: Action::empty(),
        }
    }
}

/// Loaded signatures indexed by compact id.
#[derive(Debug, Default)]
pub struct SigTable {
    sigs: Vec<Signature>,
}

impl SigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature; its compact id is reassigned to keep ids dense.
    pub fn push(&mut self, mut sig: Signature) -> SigId {
        let id = SigId(self.sigs.len() as u32);
        sig.num = id;
        self.sigs.push(sig);
        id
    }

    pub fn get(&self, sid: SigId) -> Option<&Signature> {
        self.sigs.get(sid.index())
    }

    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sigs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.sigs.iter()
    }
}

/// Immutable engine-wide lookups shared by the drivers: the inspection
/// engine table, parser capabilities, and the signature table. All built at
/// init and read-only afterwards.
#[derive(Clone, Copy)]
pub struct DetectEnv<'a> {
    pub registry: &'a EngineRegistry,
    pub parsers: &'a ParserRegistry,
    pub sigs: &'a SigTable,
}

/// Per-worker scratch state for one packet's stateful detection.
///
/// The caller resets `progress` per packet; the continue driver marks
/// signatures whose stored state can produce nothing further, and the outer
/// rule loop skips those before calling the start driver.
pub struct DetectCtx {
    /// Transaction currently under inspection, for match callbacks that
    /// need it.
    pub tx_id: u64,
    pub tx_id_set: bool,
    /// Filestore-candidate signatures in the active group for the packet
    /// direction.
    pub group_filestore_cnt: u16,
    progress: Vec<MatchProgress>,
    alerts: Vec<Alert>,
}

impl DetectCtx {
    pub fn new(sig_cnt: usize) -> Self {
        Self {
            tx_id: 0,
            tx_id_set: false,
            group_filestore_cnt: 0,
            progress: vec![MatchProgress::default(); sig_cnt],
            alerts: Vec::new(),
        }
    }

    pub fn progress(&self, sid: SigId) -> MatchProgress {
        self.progress
            .get(sid.index())
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn set_progress(&mut self, sid: SigId, progress: MatchProgress) {
        if let Some(slot) = self.progress.get_mut(sid.index()) {
            *slot = progress;
        }
    }

    /// Forget per-packet markings. Run once per packet before the drivers.
    pub fn reset_progress(&mut self) {
        self.progress.fill(MatchProgress::default());
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }

    /// Queue an alert, or for NOALERT signatures apply the action silently.
    pub(crate) fn alert_or_apply(
        &mut self,
        s: &Signature,
        p: &mut Packet,
        tx_id: Option<u64>,
        flags: AlertFlags,
    ) {
        if s.flags.contains(SigFlags::NOALERT) {
            p.action |= s.action;
        } else {
            self.alerts.push(Alert {
                sid: s.num,
                tx_id,
                flags,
            });
        }
    }

    pub(crate) fn clear_tx_id(&mut self) {
        self.tx_id = 0;
        self.tx_id_set = false;
    }
}

#[cfg(test)]
#[path = "ctx_tests.rs"]
mod tests;
