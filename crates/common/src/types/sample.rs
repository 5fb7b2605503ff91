use std::fmt;

use serde::{Deserialize, Serialize};

/// Which physical side of a machine a channel belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    L,
    R,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::L => write!(f, "L"),
            Side::R => write!(f, "R"),
        }
    }
}

/// Composite key identifying one Cycle Engine: `(line, machine_name, side)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub line: String,
    pub machine_name: String,
    pub side: Side,
}

impl ChannelKey {
    pub fn new(line: impl Into<String>, machine_name: impl Into<String>, side: Side) -> Self {
        Self {
            line: line.into(),
            machine_name: machine_name.into(),
            side,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.line, self.machine_name, self.side)
    }
}

/// One raw sample arriving from the Transport Adapter for a single channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    pub th: i64,
    pub side: i64,
    /// Wall-clock seconds, as a float (matches the source system's
    /// `time.time()`-based timestamps).
    pub t: f64,
}

impl SamplePoint {
    pub fn new(th: i64, side: i64, t: f64) -> Self {
        Self { th, side, t }
    }
}
