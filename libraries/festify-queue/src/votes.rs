//! Per-user vote edges
//!
//! `votes/{party}/{track}/{user}` holds `true` while the user has voted for
//! the track and is absent otherwise. Flipping an edge yields the
//! `VoteEvent` the dispatcher consumes.

use crate::parties;
use festify_core::{
    paths, transaction, DocumentStore, FestifyError, PartyId, Result, TrackReference,
    TransactionCommit, TransactionResult, UserId, VoteEvent,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Records vote edges and reports changes
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn DocumentStore>,
    max_attempts: u32,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn DocumentStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Set the vote edge for `(party, track, user)`
    ///
    /// Returns the resulting event, or `None` when the edge already had the
    /// requested state. Votes for unknown parties are rejected before
    /// anything is written.
    pub async fn set_vote(
        &self,
        party_id: &PartyId,
        track_id: &str,
        user_id: &UserId,
        vote: bool,
    ) -> Result<Option<VoteEvent>> {
        TrackReference::from_key(track_id)?;
        if parties::get_party(self.store.as_ref(), party_id)
            .await?
            .is_none()
        {
            return Err(FestifyError::invalid_party(format!(
                "party {party_id} not found"
            )));
        }
        let path = paths::vote(party_id.as_str(), track_id, user_id.as_str())?;

        let commit = transaction(self.store.as_ref(), &path, self.max_attempts, |current| {
            let has_voted = current == Some(&Value::Bool(true));
            Ok(match (has_voted, vote) {
                (false, true) => TransactionResult::Put(Value::Bool(true)),
                (true, false) => TransactionResult::Delete,
                _ => TransactionResult::NoOp,
            })
        })
        .await?;

        if matches!(commit, TransactionCommit::Unchanged(_)) {
            debug!(party = %party_id, track = track_id, user = %user_id, vote, "vote unchanged");
            return Ok(None);
        }

        Ok(Some(VoteEvent::new(
            party_id.clone(),
            track_id,
            user_id.clone(),
            vote,
        )))
    }

    /// Flip an edge back after its event could not be applied
    ///
    /// Leaves the edge alone if someone else already changed it.
    pub async fn revert(&self, event: &VoteEvent) -> Result<bool> {
        let path = paths::vote(
            event.party_id.as_str(),
            &event.track_id,
            event.user_id.as_str(),
        )?;

        let commit = transaction(self.store.as_ref(), &path, self.max_attempts, |current| {
            let has_voted = current == Some(&Value::Bool(true));
            Ok(match (has_voted, event.vote) {
                (true, true) => TransactionResult::Delete,
                (false, false) => TransactionResult::Put(Value::Bool(true)),
                _ => TransactionResult::NoOp,
            })
        })
        .await?;

        Ok(!matches!(commit, TransactionCommit::Unchanged(_)))
    }

    /// Drop every vote edge of a track that left the queue
    ///
    /// Returns how many edges were removed.
    pub async fn clear_track(&self, party_id: &PartyId, track_id: &str) -> Result<usize> {
        let collection = paths::votes(party_id.as_str(), track_id)?;
        let mut removed = 0;

        for (user, _) in self.store.children(&collection).await? {
            if self.store.delete(&format!("{collection}/{user}")).await? {
                removed += 1;
            }
        }

        debug!(party = %party_id, track = track_id, removed, "cleared vote edges");
        Ok(removed)
    }

    /// Users with a cast vote on the track, sorted by id
    pub async fn voters(&self, party_id: &PartyId, track_id: &str) -> Result<Vec<UserId>> {
        let collection = paths::votes(party_id.as_str(), track_id)?;

        Ok(self
            .store
            .children(&collection)
            .await?
            .into_iter()
            .filter(|(_, snapshot)| snapshot.data == Value::Bool(true))
            .map(|(user, _)| UserId::new(user))
            .collect())
    }
}
