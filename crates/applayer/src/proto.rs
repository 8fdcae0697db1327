// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol identifiers and the parser-capability lookup service.

use std::collections::HashMap;
use vigil_core::Direction;

/// Transport-layer protocol of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProto {
    Tcp,
    Udp,
}

/// Application-layer protocols known to the detection core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppProto {
    Http,
    DceRpc,
    Smb,
    Smb2,
    Dns,
    /// Protocol detection gave up on this flow.
    Failed,
}

impl AppProto {
    /// Protocols whose payload routes through the DCE/RPC inspector.
    pub fn carries_dcerpc(self) -> bool {
        matches!(self, AppProto::DceRpc | AppProto::Smb | AppProto::Smb2)
    }
}

/// Static capabilities one parser implementation advertises.
#[derive(Debug, Clone, Copy)]
pub struct ProtoCaps {
    pub supports_txs: bool,
    pub supports_tx_detect_state: bool,
    /// Progress value at which a transaction is complete, per direction.
    pub completion_status: [i32; 2],
}

impl ProtoCaps {
    pub fn completion_status(&self, dir: Direction) -> i32 {
        self.completion_status[dir.index()]
    }
}

/// Lookup service for parser capabilities.
///
/// Built once at engine init and immutable afterwards; the drivers only read
/// from it.
#[derive(Debug, Default)]
pub struct ParserRegistry {
    caps: HashMap<(IpProto, AppProto), ProtoCaps>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, proto: IpProto, alproto: AppProto, caps: ProtoCaps) {
        self.caps.insert((proto, alproto), caps);
    }

    pub fn caps(&self, proto: IpProto, alproto: AppProto) -> Option<&ProtoCaps> {
        self.caps.get(&(proto, alproto))
    }

    pub fn supports_txs(&self, proto: IpProto, alproto: AppProto) -> bool {
        self.caps(proto, alproto).is_some_and(|c| c.supports_txs)
    }

    pub fn supports_tx_detect_state(&self, proto: IpProto, alproto: AppProto) -> bool {
        self.caps(proto, alproto)
            .is_some_and(|c| c.supports_tx_detect_state)
    }

    /// Completion threshold for `dir`, or `i32::MAX` for unregistered
    /// protocols so their transactions never count as done.
    pub fn completion_status(&self, proto: IpProto, alproto: AppProto, dir: Direction) -> i32 {
        self.caps(proto, alproto)
            .map_or(i32::MAX, |c| c.completion_status(dir))
    }
}

#[cfg(test)]
#[path = "proto_tests.rs"]
mod tests;
