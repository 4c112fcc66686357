/// Timestamps that may still be waiting for server-side resolution
use serde::{Deserialize, Serialize};

/// Server value placeholder, serialized as `{".sv": "timestamp"}`
///
/// A document written with this marker gets the store's commit time in
/// its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerValue {
    #[serde(rename = ".sv")]
    kind: ServerValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ServerValueKind {
    Timestamp,
}

impl ServerValue {
    /// The commit-time timestamp marker
    pub const TIMESTAMP: Self = Self {
        kind: ServerValueKind::Timestamp,
    };
}

/// Millisecond timestamp or a pending server timestamp marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Resolved milliseconds since the Unix epoch
    Millis(i64),

    /// Resolved by the store at commit time
    Server(ServerValue),
}

impl Timestamp {
    /// The server timestamp marker
    pub const fn server() -> Self {
        Self::Server(ServerValue::TIMESTAMP)
    }

    /// Resolved milliseconds, if the marker has been replaced
    pub fn millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Server(_) => None,
        }
    }
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}
