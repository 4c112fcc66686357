//! Applies ordering decisions to the store

use crate::ordering::{decide, OrderDecision, VoteInput};
use festify_core::{
    paths, transaction, Clock, DocumentStore, FestifyError, Party, PartyId, Result,
    TrackDocument, TrackReference, TransactionCommit, TransactionResult, DEFAULT_MAX_ATTEMPTS,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Optimistic attempts per transaction before giving up (default: 25)
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Result of one vote against the store
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// A new track document was created
    Inserted(TrackDocument),

    /// The track document was rewritten
    Updated(TrackDocument),

    /// Nothing was written
    Unchanged,

    /// The track document was removed
    Removed,
}

impl VoteOutcome {
    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "inserted",
            Self::Updated(_) => "updated",
            Self::Unchanged => "unchanged",
            Self::Removed => "removed",
        }
    }

    /// Document as committed, for inserts and updates
    pub fn document(&self) -> Option<&TrackDocument> {
        match self {
            Self::Inserted(doc) | Self::Updated(doc) => Some(doc),
            Self::Unchanged | Self::Removed => None,
        }
    }
}

/// Recomputes a track's order key inside a single optimistic transaction
///
/// Holds no state besides its injected store and clock; concurrent calls for
/// the same track are serialized by the store's compare-and-swap.
#[derive(Clone)]
pub struct OrderingEngine {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl OrderingEngine {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Apply a `+1` (cast) or `-1` (retracted) vote to `track_id`
    ///
    /// `current_track` is the party's playing track, if any; `current_party`
    /// must carry a resolved `created_at`. Validation happens before the
    /// store is touched. Store failures are returned unchanged.
    pub async fn apply_vote(
        &self,
        party_id: &PartyId,
        track_id: &str,
        vote_delta: i64,
        current_track: Option<&TrackReference>,
        current_party: Option<&Party>,
    ) -> Result<VoteOutcome> {
        if vote_delta != 1 && vote_delta != -1 {
            return Err(FestifyError::invalid_input(format!(
                "vote delta must be +1 or -1, got {vote_delta}"
            )));
        }
        self.run(party_id, track_id, vote_delta, current_track, current_party)
            .await
    }

    /// Recompute the order of `track_id` without changing its vote count
    ///
    /// Used after the playing track changes so the new head gets pinned and
    /// the previous one drops back to its vote-derived key.
    pub async fn reorder(
        &self,
        party_id: &PartyId,
        track_id: &str,
        current_track: Option<&TrackReference>,
        current_party: Option<&Party>,
    ) -> Result<VoteOutcome> {
        self.run(party_id, track_id, 0, current_track, current_party)
            .await
    }

    async fn run(
        &self,
        party_id: &PartyId,
        track_id: &str,
        vote_delta: i64,
        current_track: Option<&TrackReference>,
        current_party: Option<&Party>,
    ) -> Result<VoteOutcome> {
        if party_id.is_empty() {
            return Err(FestifyError::invalid_party("missing party id"));
        }
        let party = current_party
            .ok_or_else(|| FestifyError::invalid_party(format!("party {party_id} not found")))?;
        let party_created_at = party.created_at_millis().ok_or_else(|| {
            FestifyError::invalid_party(format!("party {party_id} has no creation time"))
        })?;
        let reference = TrackReference::from_key(track_id)?;
        let path = paths::track(party_id.as_str(), track_id)?;

        let input = VoteInput {
            reference: &reference,
            vote_delta,
            current_track,
            party_created_at,
            now: self.clock.now_millis(),
        };

        let commit = transaction(
            self.store.as_ref(),
            &path,
            self.config.max_attempts,
            |current| {
                let existing = current
                    .map(|value| parse_track(&path, value))
                    .transpose()?;

                Ok(match decide(existing.as_ref(), &input)? {
                    OrderDecision::Insert(doc) | OrderDecision::Update(doc) => {
                        TransactionResult::Put(serde_json::to_value(&doc)?)
                    }
                    OrderDecision::Unchanged => TransactionResult::NoOp,
                    OrderDecision::Remove => TransactionResult::Delete,
                })
            },
        )
        .await?;

        let outcome = match commit {
            TransactionCommit::Written { snapshot, created } => {
                let doc = parse_track(&path, &snapshot.data)?;
                if created {
                    VoteOutcome::Inserted(doc)
                } else {
                    VoteOutcome::Updated(doc)
                }
            }
            TransactionCommit::Deleted => VoteOutcome::Removed,
            TransactionCommit::Unchanged(_) => VoteOutcome::Unchanged,
        };

        debug!(
            party = %party_id,
            track = track_id,
            vote_delta,
            outcome = outcome.as_str(),
            "applied vote"
        );

        Ok(outcome)
    }
}

pub(crate) fn parse_track(path: &str, value: &serde_json::Value) -> Result<TrackDocument> {
    TrackDocument::deserialize(value)
        .map_err(|e| FestifyError::invalid_document(path, e.to_string()))
}
