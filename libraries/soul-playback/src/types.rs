//! Queue policy types

use serde::{Deserialize, Serialize};

/// Ordering applied when a queue is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    /// Keep input order
    #[default]
    Default,

    /// Reverse input order
    Reverse,

    /// Random permutation; the input order becomes the un-shuffle snapshot
    Shuffle,
}

/// What happens after the current track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Repeat the current track
    Single,

    /// Wrap around to the first track
    Queue,
}

impl std::str::FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "single" | "one" => Ok(Self::Single),
            "queue" | "all" => Ok(Self::Queue),
            other => Err(format!("unknown loop mode: {}", other)),
        }
    }
}

impl std::str::FromStr for OrderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "reverse" => Ok(Self::Reverse),
            "shuffle" => Ok(Self::Shuffle),
            other => Err(format!("unknown order mode: {}", other)),
        }
    }
}
