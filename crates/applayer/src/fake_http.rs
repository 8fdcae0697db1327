// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP request parser for exercising the detection core in tests.
//!
//! Not a real parser: line-oriented request heads, `Content-Length` bodies,
//! pipelined requests, and multipart uploads surfacing one file per
//! transaction. Responses are not modeled.

use crate::proto::ProtoCaps;
use crate::state::{AppLayerState, AppLayerTx, StateError};
use std::any::Any;
use vigil_core::{Direction, TxDetectState};

pub const PROGRESS_NONE: i32 = 0;
pub const PROGRESS_LINE: i32 = 1;
pub const PROGRESS_HEADERS: i32 = 2;
pub const PROGRESS_BODY: i32 = 3;
pub const PROGRESS_COMPLETE: i32 = 4;

/// A file carried by a transaction, with the storage verdict flags the file
/// subsystem would track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFile {
    pub filename: String,
    pub store: bool,
    pub nostore: bool,
}

/// One request/response pair. Only the request side is populated.
#[derive(Debug, Default)]
pub struct FakeHttpTx {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub headers_done: bool,
    pub body: String,
    pub files: Vec<FakeFile>,
    store_disabled: bool,
    progress: [i32; 2],
    detect: Option<Box<TxDetectState>>,
}

impl FakeHttpTx {
    fn open(method: String, uri: String) -> Self {
        Self {
            method,
            uri,
            progress: [PROGRESS_LINE, PROGRESS_NONE],
            ..Self::default()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn cookie(&self) -> Option<&str> {
        self.header("Cookie")
    }

    /// Surface a multipart upload file once its filename is visible.
    fn scan_upload(&mut self) {
        if !self.files.is_empty() {
            return;
        }
        let Some(at) = self.body.find("filename=\"") else {
            return;
        };
        let rest = &self.body[at + "filename=\"".len()..];
        let Some(end) = rest.find('"') else {
            return;
        };
        self.files.push(FakeFile {
            filename: rest[..end].to_string(),
            store: false,
            nostore: self.store_disabled,
        });
        if let Some(state) = self.detect.as_mut() {
            state.on_new_file(Direction::ToServer);
        }
    }
}

impl AppLayerTx for FakeHttpTx {
    fn progress(&self, dir: Direction) -> i32 {
        self.progress[dir.index()]
    }

    fn detect_state(&self) -> Option<&TxDetectState> {
        self.detect.as_deref()
    }

    fn detect_state_mut(&mut self) -> Option<&mut TxDetectState> {
        self.detect.as_deref_mut()
    }

    fn set_detect_state(&mut self, state: TxDetectState) -> Result<(), StateError> {
        self.detect = Some(Box::new(state));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Headers,
    Body { remaining: usize },
}

/// Reassembled request-side HTTP state for one flow.
#[derive(Debug)]
pub struct FakeHttpState {
    txs: Vec<FakeHttpTx>,
    phase: Phase,
    buf: String,
    valid: bool,
}

impl Default for FakeHttpState {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHttpState {
    pub fn new() -> Self {
        Self {
            txs: Vec::new(),
            phase: Phase::Idle,
            buf: String::new(),
            valid: true,
        }
    }

    pub fn caps() -> ProtoCaps {
        ProtoCaps {
            supports_txs: true,
            supports_tx_detect_state: true,
            completion_status: [PROGRESS_COMPLETE, PROGRESS_COMPLETE],
        }
    }

    /// Mimic a state whose connection went away.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn tx_data(&self, tx_id: u64) -> Option<&FakeHttpTx> {
        self.txs.get(usize::try_from(tx_id).ok()?)
    }

    pub fn tx_data_mut(&mut self, tx_id: u64) -> Option<&mut FakeHttpTx> {
        self.txs.get_mut(usize::try_from(tx_id).ok()?)
    }

    /// Test hook: append a transaction directly, bypassing the parser.
    pub fn push_raw_tx(&mut self, method: &str, uri: &str, progress_ts: i32) -> u64 {
        let mut tx = FakeHttpTx::open(method.to_string(), uri.to_string());
        tx.progress[Direction::ToServer.index()] = progress_ts;
        self.txs.push(tx);
        self.txs.len() as u64 - 1
    }

    /// Test hook: force a transaction's to-server progress.
    pub fn set_progress_ts(&mut self, tx_id: u64, progress: i32) {
        if let Some(tx) = self.tx_data_mut(tx_id) {
            tx.progress[Direction::ToServer.index()] = progress;
        }
    }

    /// Post-match filestore action: flag the transaction's pending files for
    /// storing.
    pub fn store_files(&mut self, tx_id: u64) {
        if let Some(tx) = self.tx_data_mut(tx_id) {
            for file in &mut tx.files {
                if !file.nostore {
                    file.store = true;
                }
            }
        }
    }

    /// Feed one to-server chunk. Advances transactions, headers and bodies,
    /// and surfaces upload files as their names become visible.
    pub fn parse_ts(&mut self, data: &str) {
        self.buf.push_str(data);
        loop {
            match self.phase {
                Phase::Body { remaining } => {
                    if self.buf.is_empty() {
                        break;
                    }
                    let take = remaining.min(self.buf.len());
                    let piece: String = self.buf.drain(..take).collect();
                    let Some(tx) = self.txs.last_mut() else {
                        break;
                    };
                    tx.body.push_str(&piece);
                    tx.scan_upload();
                    if take == remaining {
                        tx.progress[Direction::ToServer.index()] = PROGRESS_COMPLETE;
                        self.phase = Phase::Idle;
                    } else {
                        self.phase = Phase::Body {
                            remaining: remaining - take,
                        };
                        break;
                    }
                }
                Phase::Idle => {
                    let Some(line) = self.next_line() else { break };
                    if line.is_empty() {
                        continue;
                    }
                    let mut parts = line.split_whitespace();
                    let method = parts.next().unwrap_or_default().to_string();
                    let uri = parts.next().unwrap_or_default().to_string();
                    self.txs.push(FakeHttpTx::open(method, uri));
                    self.phase = Phase::Headers;
                }
                Phase::Headers => {
                    let Some(line) = self.next_line() else { break };
                    let Some(tx) = self.txs.last_mut() else { break };
                    if line.is_empty() {
                        tx.headers_done = true;
                        tx.progress[Direction::ToServer.index()] = PROGRESS_HEADERS;
                        let body_len = tx
                            .header("Content-Length")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if body_len > 0 {
                            tx.progress[Direction::ToServer.index()] = PROGRESS_BODY;
                            self.phase = Phase::Body {
                                remaining: body_len,
                            };
                        } else {
                            tx.progress[Direction::ToServer.index()] = PROGRESS_COMPLETE;
                            self.phase = Phase::Idle;
                        }
                    } else if let Some((name, value)) = line.split_once(':') {
                        tx.headers
                            .push((name.trim().to_string(), value.trim().to_string()));
                    }
                }
            }
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.find("\r\n")?;
        let raw: String = self.buf.drain(..pos + 2).collect();
        Some(raw.trim_end_matches("\r\n").to_string())
    }
}

impl AppLayerState for FakeHttpState {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn tx_count(&self) -> u64 {
        self.txs.len() as u64
    }

    fn tx(&self, tx_id: u64) -> Option<&dyn AppLayerTx> {
        self.tx_data(tx_id).map(|t| t as &dyn AppLayerTx)
    }

    fn tx_mut(&mut self, tx_id: u64) -> Option<&mut dyn AppLayerTx> {
        self.tx_data_mut(tx_id).map(|t| t as &mut dyn AppLayerTx)
    }

    fn disable_file_store(&mut self, tx_id: u64, dir: Direction) {
        if dir != Direction::ToServer {
            return;
        }
        let Some(tx) = self.tx_data_mut(tx_id) else {
            return;
        };
        tx.store_disabled = true;
        for file in &mut tx.files {
            if !file.store {
                file.nostore = true;
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
#[path = "fake_http_tests.rs"]
mod tests;
