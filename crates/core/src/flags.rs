// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bitsets tracked per stored record and per direction state.

use crate::direction::Direction;
use bitflags::bitflags;

bitflags! {
    /// Progress bits for one stored signature on one transaction or flow.
    ///
    /// The per-engine bits record which inspection engines the signature has
    /// already been run through, so a later packet resumes where the last one
    /// stopped. `FULL_INSPECT` and `CANT_MATCH` are terminal: only the
    /// new-file carve-out in the continue driver clears them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InspectFlags: u32 {
        const URI = 1 << 0;
        const METHOD = 1 << 1;
        const HEADER = 1 << 2;
        const COOKIE = 1 << 3;
        const CLIENT_BODY = 1 << 4;
        const SERVER_BODY = 1 << 5;
        /// File inspection consumed to-server files.
        const FILE_TS = 1 << 6;
        /// File inspection consumed to-client files.
        const FILE_TC = 1 << 7;
        /// Nothing left to inspect unless a new file arrives.
        const FULL_INSPECT = 1 << 8;
        /// Proven unable to match on this transaction.
        const CANT_MATCH = 1 << 9;
    }
}

impl Default for InspectFlags {
    fn default() -> Self {
        InspectFlags::empty()
    }
}

impl InspectFlags {
    /// The file-inspection bit for packets travelling in `dir`.
    pub fn file_inspect(dir: Direction) -> InspectFlags {
        match dir {
            Direction::ToServer => InspectFlags::FILE_TS,
            Direction::ToClient => InspectFlags::FILE_TC,
        }
    }
}

bitflags! {
    /// Direction-scoped flags on a [`crate::DirState`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirStateFlags: u8 {
        /// A new to-server file appeared since the last inspection.
        const FILE_TS_NEW = 1 << 0;
        /// A new to-client file appeared since the last inspection.
        const FILE_TC_NEW = 1 << 1;
        /// File storing has been turned off for this transaction.
        const FILE_STORE_DISABLED = 1 << 2;
    }
}

impl Default for DirStateFlags {
    fn default() -> Self {
        DirStateFlags::empty()
    }
}

impl DirStateFlags {
    /// The new-file flag for files arriving in `dir`.
    pub fn file_new(dir: Direction) -> DirStateFlags {
        match dir {
            Direction::ToServer => DirStateFlags::FILE_TS_NEW,
            Direction::ToClient => DirStateFlags::FILE_TC_NEW,
        }
    }
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
