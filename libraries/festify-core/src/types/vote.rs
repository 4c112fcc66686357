/// Vote change notifications
use crate::types::{PartyId, UserId};
use serde::{Deserialize, Serialize};

/// A vote edge changed: `vote` is the new state (cast or retracted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEvent {
    /// Party the vote belongs to
    pub party_id: PartyId,

    /// Track key, `{provider}-{id}`
    pub track_id: String,

    /// Voting user
    pub user_id: UserId,

    /// `true` when the vote was cast, `false` when retracted
    pub vote: bool,
}

impl VoteEvent {
    /// Create a vote event
    pub fn new(
        party_id: PartyId,
        track_id: impl Into<String>,
        user_id: UserId,
        vote: bool,
    ) -> Self {
        Self {
            party_id,
            track_id: track_id.into(),
            user_id,
            vote,
        }
    }

    /// `+1` for a cast vote, `-1` for a retracted one
    pub fn delta(&self) -> i64 {
        if self.vote {
            1
        } else {
            -1
        }
    }
}
