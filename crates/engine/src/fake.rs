// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake HTTP inspection engines and a packet-drive rig.
//!
//! The engines evaluate simple substring patterns against the fake HTTP
//! parser's transactions, with the undecided/never semantics the real
//! protocol engines have: values fixed at parse time (method, uri) fail
//! terminally, values that may still arrive (headers, cookies, files) stay
//! undecided until the enclosing section is complete.

use crate::ctx::{Alert, DetectCtx, DetectEnv, Packet, SigTable};
use crate::flow::{Flow, FlowLock};
use crate::lifecycle::{
    clear_new_file_flags, has_inspectable_state, update_inspect_tx_id, InspectableState,
};
use crate::registry::{EngineRegistry, InspectEngine, InspectResult, TxInspect};
use crate::resume::continue_detection;
use crate::start::start_detection;
use parking_lot::RwLock;
use vigil_applayer::fake_http::{FakeFile, FakeHttpState, FakeHttpTx, PROGRESS_COMPLETE};
use vigil_applayer::{AppLayerState, AppLayerTx, AppProto, IpProto, ParserRegistry};
use vigil_core::{
    Direction, FlowMatch, FlowMatchResult, InspectFlags, MatchProgress, SigFlags, SigId, Signature,
    SmList, StoredSig, StreamFlags,
};

fn cant(s: &Signature) -> InspectResult {
    if s.flags.contains(SigFlags::FILESTORE) {
        InspectResult::CantMatchFilestore
    } else {
        InspectResult::CantMatch
    }
}

fn fake_tx<'a>(tx: &'a dyn AppLayerTx) -> Option<&'a FakeHttpTx> {
    tx.as_any().downcast_ref()
}

/// `http_method`: fixed once the request line is parsed, so a miss is final.
pub struct MethodInspect;

impl TxInspect for MethodInspect {
    fn inspect(
        &self,
        s: &Signature,
        _stream: StreamFlags,
        _state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        _tx_id: u64,
    ) -> InspectResult {
        let Some(tx) = fake_tx(tx) else {
            return InspectResult::NoMatch;
        };
        let Some(pat) = s.tx_list::<String>(SmList::HttpMethod) else {
            return InspectResult::NoMatch;
        };
        if tx.method.contains(pat.as_str()) {
            InspectResult::Match
        } else {
            cant(s)
        }
    }
}

/// `http_uri`: fixed once the request line is parsed.
pub struct UriInspect;

impl TxInspect for UriInspect {
    fn inspect(
        &self,
        s: &Signature,
        _stream: StreamFlags,
        _state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        _tx_id: u64,
    ) -> InspectResult {
        let Some(tx) = fake_tx(tx) else {
            return InspectResult::NoMatch;
        };
        let Some(pat) = s.tx_list::<String>(SmList::HttpUri) else {
            return InspectResult::NoMatch;
        };
        if tx.uri.contains(pat.as_str()) {
            InspectResult::Match
        } else {
            cant(s)
        }
    }
}

/// `http_header`: undecided while headers may still arrive.
pub struct HeaderInspect;

impl TxInspect for HeaderInspect {
    fn inspect(
        &self,
        s: &Signature,
        _stream: StreamFlags,
        _state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        _tx_id: u64,
    ) -> InspectResult {
        let Some(tx) = fake_tx(tx) else {
            return InspectResult::NoMatch;
        };
        let Some(pat) = s.tx_list::<String>(SmList::HttpHeader) else {
            return InspectResult::NoMatch;
        };
        if tx.headers.iter().any(|(_, v)| v.contains(pat.as_str())) {
            InspectResult::Match
        } else if tx.headers_done {
            cant(s)
        } else {
            InspectResult::NoMatch
        }
    }
}

/// `http_cookie`: undecided while headers may still arrive.
pub struct CookieInspect;

impl TxInspect for CookieInspect {
    fn inspect(
        &self,
        s: &Signature,
        _stream: StreamFlags,
        _state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        _tx_id: u64,
    ) -> InspectResult {
        let Some(tx) = fake_tx(tx) else {
            return InspectResult::NoMatch;
        };
        let Some(pat) = s.tx_list::<String>(SmList::HttpCookie) else {
            return InspectResult::NoMatch;
        };
        match tx.cookie() {
            Some(cookie) if cookie.contains(pat.as_str()) => InspectResult::Match,
            Some(_) => cant(s),
            None if tx.headers_done => cant(s),
            None => InspectResult::NoMatch,
        }
    }
}

/// File keywords: undecided until the request body is complete.
pub struct FileInspect;

impl TxInspect for FileInspect {
    fn inspect(
        &self,
        s: &Signature,
        _stream: StreamFlags,
        _state: &dyn AppLayerState,
        tx: &dyn AppLayerTx,
        _tx_id: u64,
    ) -> InspectResult {
        let done = tx.progress(Direction::ToServer) >= PROGRESS_COMPLETE;
        let Some(tx) = fake_tx(tx) else {
            return InspectResult::NoMatch;
        };
        let Some(pat) = s.tx_list::<String>(SmList::FileMatch) else {
            return InspectResult::NoMatch;
        };
        if tx
            .files
            .iter()
            .any(|f| f.filename.contains(pat.as_str()))
        {
            InspectResult::Match
        } else if done {
            cant(s)
        } else {
            InspectResult::NoMatch
        }
    }
}

/// Flow submatch that matches once any transaction exists.
pub struct TxSeen;

impl FlowMatch for TxSeen {
    fn app_layer_match(
        &self,
        _stream: StreamFlags,
        state: &dyn std::any::Any,
        _s: &Signature,
    ) -> FlowMatchResult {
        let Some(http) = state.downcast_ref::<FakeHttpState>() else {
            return FlowMatchResult::Pending;
        };
        if AppLayerState::tx_count(http) > 0 {
            FlowMatchResult::Match
        } else {
            FlowMatchResult::Pending
        }
    }
}

/// Flow submatch that matches once any transaction carries a cookie
/// containing the pattern.
pub struct CookieSeen(pub String);

impl FlowMatch for CookieSeen {
    fn app_layer_match(
        &self,
        _stream: StreamFlags,
        state: &dyn std::any::Any,
        _s: &Signature,
    ) -> FlowMatchResult {
        let Some(http) = state.downcast_ref::<FakeHttpState>() else {
            return FlowMatchResult::Pending;
        };
        for tx_id in 0..AppLayerState::tx_count(http) {
            let seen = http
                .tx_data(tx_id)
                .and_then(|tx| tx.cookie())
                .is_some_and(|c| c.contains(self.0.as_str()));
            if seen {
                return FlowMatchResult::Match;
            }
        }
        FlowMatchResult::Pending
    }
}

/// Flow submatch that can never match.
pub struct NeverFlowMatch;

impl FlowMatch for NeverFlowMatch {
    fn app_layer_match(
        &self,
        _stream: StreamFlags,
        _state: &dyn std::any::Any,
        _s: &Signature,
    ) -> FlowMatchResult {
        FlowMatchResult::CantMatch
    }
}

/// Register the to-server HTTP engine set in evaluation order.
pub fn register_http_engines(registry: &mut EngineRegistry) {
    let dir = Direction::ToServer;
    registry.register(
        IpProto::Tcp,
        AppProto::Http,
        dir,
        InspectEngine::new(SmList::HttpUri, InspectFlags::URI, UriInspect),
    );
    registry.register(
        IpProto::Tcp,
        AppProto::Http,
        dir,
        InspectEngine::new(SmList::HttpMethod, InspectFlags::METHOD, MethodInspect),
    );
    registry.register(
        IpProto::Tcp,
        AppProto::Http,
        dir,
        InspectEngine::new(SmList::HttpHeader, InspectFlags::HEADER, HeaderInspect),
    );
    registry.register(
        IpProto::Tcp,
        AppProto::Http,
        dir,
        InspectEngine::new(SmList::HttpCookie, InspectFlags::COOKIE, CookieInspect),
    );
    registry.register(
        IpProto::Tcp,
        AppProto::Http,
        dir,
        InspectEngine::new(SmList::FileMatch, InspectFlags::FILE_TS, FileInspect),
    );
}

/// Drives packets through the same decision loop the outer engine runs:
/// pre-check, continue driver, then the start driver for every candidate
/// signature the prefilter has not skipped.
pub struct TestRig {
    pub registry: EngineRegistry,
    pub parsers: ParserRegistry,
    pub sigs: SigTable,
    pub flow: FlowLock,
    pub ctx: DetectCtx,
    pub version: u16,
}

impl TestRig {
    pub fn http() -> Self {
        let mut parsers = ParserRegistry::new();
        parsers.register(IpProto::Tcp, AppProto::Http, FakeHttpState::caps());
        let mut registry = EngineRegistry::new();
        register_http_engines(&mut registry);
        let mut flow = Flow::new(IpProto::Tcp, AppProto::Http);
        flow.alstate = Some(Box::new(FakeHttpState::new()));
        Self {
            registry,
            parsers,
            sigs: SigTable::new(),
            flow: RwLock::new(flow),
            ctx: DetectCtx::new(0),
            version: 0,
        }
    }

    pub fn add_sig(&mut self, sig: Signature) -> SigId {
        let id = self.sigs.push(sig);
        self.ctx = DetectCtx::new(self.sigs.len());
        id
    }

    /// Parse one to-server chunk and run a full detection pass.
    pub fn feed_ts(&mut self, data: &str) -> Vec<Alert> {
        self.feed(data, StreamFlags::empty())
    }

    pub fn feed(&mut self, data: &str, extra: StreamFlags) -> Vec<Alert> {
        self.with_http(|http| http.parse_ts(data));
        self.version = self.version.wrapping_add(1);
        self.detect(extra)
    }

    /// Run the outer-engine decision loop for one packet without new data.
    pub fn detect(&mut self, extra: StreamFlags) -> Vec<Alert> {
        let stream = StreamFlags::TO_SERVER | extra;
        let mut p = Packet::new(stream);
        self.ctx.reset_progress();
        self.ctx.group_filestore_cnt = self
            .sigs
            .iter()
            .filter(|s| s.flags.contains(SigFlags::FILESTORE))
            .count() as u16;

        let env = DetectEnv {
            registry: &self.registry,
            parsers: &self.parsers,
            sigs: &self.sigs,
        };
        if has_inspectable_state(&self.flow, &self.parsers, self.version, stream)
            == InspectableState::New
        {
            let _ = continue_detection(
                &mut self.ctx,
                &env,
                &mut p,
                &self.flow,
                AppProto::Http,
                self.version,
            );
        }
        for idx in 0..self.sigs.len() {
            let sid = SigId(idx as u32);
            if self.ctx.progress(sid) == MatchProgress::NoNewState {
                continue;
            }
            let Some(s) = self.sigs.get(sid) else {
                continue;
            };
            start_detection(
                &mut self.ctx,
                &env,
                s,
                &mut p,
                &self.flow,
                AppProto::Http,
                self.version,
            );
        }

        let alerts = self.ctx.take_alerts();

        // post-match filestore action: alerting filestore sigs flag their
        // transaction's files for storing
        for alert in &alerts {
            if let Some(tx_id) = alert.tx_id {
                let filestore = self
                    .sigs
                    .get(alert.sid)
                    .is_some_and(|s| s.flags.contains(SigFlags::FILESTORE));
                if filestore {
                    self.with_http(|http| http.store_files(tx_id));
                }
            }
        }

        update_inspect_tx_id(&self.flow, &self.parsers, Direction::ToServer);
        {
            let mut f = self.flow.write();
            clear_new_file_flags(&mut f, &self.parsers, Direction::ToServer);
        }
        alerts
    }

    pub fn with_http<T>(&self, body: impl FnOnce(&mut FakeHttpState) -> T) -> Option<T> {
        let mut f = self.flow.write();
        let state = f.alstate.as_deref_mut()?;
        let http = state.as_any_mut().downcast_mut::<FakeHttpState>()?;
        Some(body(http))
    }

    pub fn http_ref<T>(&self, body: impl FnOnce(&FakeHttpState) -> T) -> Option<T> {
        let f = self.flow.read();
        let state = f.alstate.as_deref()?;
        let http = state.as_any().downcast_ref::<FakeHttpState>()?;
        Some(body(http))
    }

    /// Stored record count on a transaction's to-server side.
    pub fn tx_record_count(&self, tx_id: u64) -> u32 {
        self.http_ref(|http| {
            http.tx_data(tx_id)
                .and_then(|tx| tx.detect_state())
                .map_or(0, |state| state.dir(Direction::ToServer).sigs.len())
        })
        .unwrap_or(0)
    }

    pub fn tx_record(&self, tx_id: u64, idx: u32) -> Option<StoredSig> {
        self.http_ref(|http| {
            http.tx_data(tx_id)?
                .detect_state()?
                .dir(Direction::ToServer)
                .sigs
                .get(idx)
                .copied()
        })
        .flatten()
    }

    /// The first file on a transaction, if any.
    pub fn file(&self, tx_id: u64) -> Option<FakeFile> {
        self.http_ref(|http| http.tx_data(tx_id)?.files.first().cloned())
            .flatten()
    }
}
