// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signature identity and the submatch capability seams.
//!
//! The core never parses rules. It sees a signature as a compact id, a few
//! behavioral flags, a set of typed submatch lists consumed by protocol
//! inspection engines, and an ordered list of flow-scoped submatch callbacks.

use crate::direction::StreamFlags;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Compact internal signature id, assigned densely by the rule loader.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SigId(pub u32);

impl SigId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Behavioral flags the core reads off a signature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SigFlags: u8 {
        /// Match silently: apply the action but queue no alert.
        const NOALERT = 1 << 0;
        /// The signature asks for matched files to be persisted.
        const FILESTORE = 1 << 1;
    }
}

bitflags! {
    /// Packet actions a matching signature applies.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Action: u8 {
        const ALERT = 1 << 0;
        const DROP = 1 << 1;
        const PASS = 1 << 2;
    }
}

/// Typed submatch list slots a signature can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmList {
    HttpUri,
    HttpMethod,
    HttpHeader,
    HttpCookie,
    HttpClientBody,
    HttpServerBody,
    /// File keywords (filename, filemagic, ...).
    FileMatch,
    /// DCE/RPC payload keywords.
    Dce,
}

/// Result of evaluating one flow-scoped submatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowMatchResult {
    Match,
    /// Not decided yet; suspend the walk here and resume on the next packet.
    Pending,
    /// Can never match on this flow.
    CantMatch,
}

/// One flow-scoped submatch (the app-layer keyword seam).
///
/// `state` is the opaque app-layer state the enclosing engine routed here;
/// implementations downcast to the protocol state they understand.
pub trait FlowMatch: Send + Sync {
    fn app_layer_match(
        &self,
        stream: StreamFlags,
        state: &dyn Any,
        s: &Signature,
    ) -> FlowMatchResult;
}

/// Per-signature prefilter marking maintained by the drivers.
///
/// `NoNewState` tells the outer rule loop that the stored state cannot yield
/// anything further this packet, so the signature is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchProgress {
    #[default]
    HasNewState,
    NoNewState,
}

impl fmt::Display for MatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchProgress::HasNewState => write!(f, "has_new_state"),
            MatchProgress::NoNewState => write!(f, "no_new_state"),
        }
    }
}

/// A rule as the stateful core sees it.
pub struct Signature {
    pub num: SigId,
    pub flags: SigFlags,
    pub action: Action,
    tx_lists: HashMap<SmList, Box<dyn Any + Send + Sync>>,
    flow_matches: Vec<Box<dyn FlowMatch>>,
}

impl Signature {
    pub fn new(num: SigId) -> Self {
        Self {
            num,
            flags: SigFlags::empty(),
            action: Action::ALERT,
            tx_lists: HashMap::new(),
            flow_matches: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: SigFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Attach the payload for one submatch list. Engines retrieve it with
    /// [`Signature::tx_list`] and downcast to the type they registered.
    pub fn with_tx_list(mut self, list: SmList, payload: impl Any + Send + Sync) -> Self {
        self.tx_lists.insert(list, Box::new(payload));
        self
    }

    pub fn with_flow_match(mut self, m: impl FlowMatch + 'static) -> Self {
        self.flow_matches.push(Box::new(m));
        self
    }

    pub fn has_tx_list(&self, list: SmList) -> bool {
        self.tx_lists.contains_key(&list)
    }

    pub fn tx_list<T: Any>(&self, list: SmList) -> Option<&T> {
        self.tx_lists.get(&list).and_then(|p| p.downcast_ref())
    }

    pub fn flow_matches(&self) -> &[Box<dyn FlowMatch>] {
        &self.flow_matches
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("num", &self.num)
            .field("flags", &self.flags)
            .field("action", &self.action)
            .field("tx_lists", &self.tx_lists.keys())
            .field("flow_matches", &self.flow_matches.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "sig_tests.rs"]
mod tests;
