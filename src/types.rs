//! Core types for hnreplies

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifier of one node in the remote item graph
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ItemId> for i64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for ItemId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Kind of remote item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Missing or unrecognised type
    #[default]
    Unknown,
    /// Top-level story
    Story,
    /// Reply to a story or another comment
    Comment,
    /// Job posting
    Job,
    /// Poll
    Poll,
    /// Option belonging to a poll
    PollOpt,
}

impl ItemType {
    /// Map the API's `type` string onto an ItemType
    pub fn from_api(value: &str) -> Self {
        match value {
            "story" => ItemType::Story,
            "comment" => ItemType::Comment,
            "job" => ItemType::Job,
            "poll" => ItemType::Poll,
            "pollopt" => ItemType::PollOpt,
            _ => ItemType::Unknown,
        }
    }
}

/// Lifetime transport counters; monotonically increasing, never reset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// Transfers dispatched to a slot
    pub requests: u64,
    /// Body bytes received across all transfers
    pub bytes: u64,
}

/// Summary of one resolution round
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Comment items seen in the change set
    pub comments: usize,
    /// Comments filed under their parent's author
    pub updated: usize,
    /// Comments whose parent author could not be resolved
    pub unknown: usize,
    /// Fetch, parse and store failures
    pub errors: usize,
    /// Items that were not comments
    pub other: usize,
    /// Transport counters at the end of the round
    pub fetch: FetchStats,
    /// Wall-clock duration of the round
    pub elapsed: Duration,
}

impl RoundReport {
    /// Whether the round ran past the given threshold
    pub fn is_slow(&self, threshold: Duration) -> bool {
        self.elapsed > threshold
    }
}

impl std::fmt::Display for RoundReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Time: {:6} ms  Comments: {:3}  Updated: {:3}  Unknown: {:3}  Errors: {:3}  Other: {:3} | Total requests: {:7} ({} bytes)",
            self.elapsed.as_millis(),
            self.comments,
            self.updated,
            self.unknown,
            self.errors,
            self.other,
            self.fetch.requests,
            self.fetch.bytes
        )
    }
}
