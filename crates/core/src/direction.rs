// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow direction and per-packet stream flags.

use bitflags::bitflags;
use std::fmt;

/// Direction of travel relative to the flow originator.
///
/// Every per-direction structure in the core is a two-element array indexed
/// by [`Direction::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ToServer,
    ToClient,
}

impl Direction {
    /// Ordinal used to index per-direction arrays.
    pub const fn index(self) -> usize {
        match self {
            Direction::ToServer => 0,
            Direction::ToClient => 1,
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::ToServer => Direction::ToClient,
            Direction::ToClient => Direction::ToServer,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToServer => write!(f, "to_server"),
            Direction::ToClient => write!(f, "to_client"),
        }
    }
}

bitflags! {
    /// Stream-level flags carried by a packet into the drivers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StreamFlags: u8 {
        const TO_SERVER = 1 << 0;
        const TO_CLIENT = 1 << 1;
        /// First data for this direction.
        const START = 1 << 2;
        /// No more data will arrive for this direction.
        const EOF = 1 << 3;
    }
}

impl StreamFlags {
    /// The direction this packet travels in. Exactly one of `TO_SERVER` /
    /// `TO_CLIENT` is expected to be set; `TO_SERVER` wins if both are.
    pub fn direction(self) -> Direction {
        if self.contains(StreamFlags::TO_SERVER) {
            Direction::ToServer
        } else {
            Direction::ToClient
        }
    }

    pub fn has_direction(self, dir: Direction) -> bool {
        match dir {
            Direction::ToServer => self.contains(StreamFlags::TO_SERVER),
            Direction::ToClient => self.contains(StreamFlags::TO_CLIENT),
        }
    }
}

impl From<Direction> for StreamFlags {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::ToServer => StreamFlags::TO_SERVER,
            Direction::ToClient => StreamFlags::TO_CLIENT,
        }
    }
}

#[cfg(test)]
#[path = "direction_tests.rs"]
mod tests;
