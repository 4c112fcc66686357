/// Party domain type
use crate::types::{PartyId, Timestamp};
use serde::{Deserialize, Serialize};

/// Voting session with one shared queue, stored at `parties/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Externally assigned identifier
    pub id: PartyId,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Server-assigned creation time; every track order is relative to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl Party {
    /// Create a party whose creation time the store fills in on commit
    pub fn new(id: PartyId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            created_at: Some(Timestamp::server()),
        }
    }

    /// Resolved creation time in milliseconds
    ///
    /// `None` marks a party that must not be processed.
    pub fn created_at_millis(&self) -> Option<i64> {
        self.created_at.and_then(|ts| ts.millis())
    }
}
