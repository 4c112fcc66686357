//! Reading and maintaining a party's queue
//!
//! The queue is the party's track collection listed ascending by `order`.
//! Its head is the currently playing track.

use crate::engine::parse_track;
use crate::ordering::{order_key, PINNED_ORDER};
use festify_core::{
    paths, transaction, Clock, DocumentStore, FestifyError, Party, PartyId, Result, Timestamp,
    TrackDocument, TrackReference, TransactionCommit, TransactionResult,
};
use std::sync::Arc;
use tracing::{debug, info};

/// One queued track with its document key
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// `{provider}-{id}`
    pub key: String,
    pub track: TrackDocument,
}

/// Queue view over a document store
#[derive(Clone)]
pub struct PartyQueue {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl PartyQueue {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, max_attempts: u32) -> Self {
        Self {
            store,
            clock,
            max_attempts,
        }
    }

    /// All tracks of a party, ascending by order, ties by key
    pub async fn tracks(&self, party_id: &PartyId) -> Result<Vec<QueueEntry>> {
        let collection = paths::tracks(party_id.as_str())?;
        let children = self.store.children(&collection).await?;

        let mut entries = children
            .into_iter()
            .map(|(key, snapshot)| {
                let track = parse_track(&format!("{collection}/{key}"), &snapshot.data)?;
                Ok(QueueEntry { key, track })
            })
            .collect::<Result<Vec<_>>>()?;

        // Children arrive sorted by key; a stable sort keeps that as tie-break
        entries.sort_by(|a, b| a.track.order.total_cmp(&b.track.order));
        Ok(entries)
    }

    /// Head of the queue, the track currently playing
    pub async fn current_track(&self, party_id: &PartyId) -> Result<Option<QueueEntry>> {
        Ok(self.tracks(party_id).await?.into_iter().next())
    }

    /// Stamp `played_at` on a queued track
    ///
    /// Returns the updated document, or `None` if the track is not queued.
    /// A track that already has `played_at` is left as is.
    pub async fn mark_played(
        &self,
        party_id: &PartyId,
        track_id: &str,
    ) -> Result<Option<TrackDocument>> {
        TrackReference::from_key(track_id)?;
        let path = paths::track(party_id.as_str(), track_id)?;

        let commit = transaction(self.store.as_ref(), &path, self.max_attempts, |current| {
            let Some(value) = current else {
                return Ok(TransactionResult::NoOp);
            };
            let mut track = parse_track(&path, value)?;
            if track.has_played() {
                return Ok(TransactionResult::NoOp);
            }
            track.played_at = Some(Timestamp::server());
            Ok(TransactionResult::Put(serde_json::to_value(&track)?))
        })
        .await?;

        match commit {
            TransactionCommit::Written { snapshot, .. } => {
                debug!(party = %party_id, track = track_id, "marked track as played");
                parse_track(&path, &snapshot.data).map(Some)
            }
            TransactionCommit::Unchanged(Some(snapshot)) => {
                parse_track(&path, &snapshot.data).map(Some)
            }
            TransactionCommit::Unchanged(None) | TransactionCommit::Deleted => Ok(None),
        }
    }

    /// Remove a track that has finished playing
    ///
    /// Only documents with `played_at` set are removed. Returns whether the
    /// track left the queue.
    pub async fn remove_played(&self, party_id: &PartyId, track_id: &str) -> Result<bool> {
        TrackReference::from_key(track_id)?;
        let path = paths::track(party_id.as_str(), track_id)?;

        let commit = transaction(self.store.as_ref(), &path, self.max_attempts, |current| {
            let Some(value) = current else {
                return Ok(TransactionResult::NoOp);
            };
            Ok(if parse_track(&path, value)?.has_played() {
                TransactionResult::Delete
            } else {
                TransactionResult::NoOp
            })
        })
        .await?;

        Ok(matches!(commit, TransactionCommit::Deleted))
    }

    /// Queue tracks from a standing playlist as fallback tracks
    ///
    /// Tracks that already have a document are left alone. Fallback tracks
    /// start with zero votes and sort in playlist order after every voted
    /// track. When the queue was empty the first new track starts playing
    /// and is pinned. Returns how many documents were created.
    pub async fn seed_fallback(
        &self,
        party: &Party,
        references: &[TrackReference],
    ) -> Result<usize> {
        let created_at = party.created_at_millis().ok_or_else(|| {
            FestifyError::invalid_party(format!("party {} has no creation time", party.id))
        })?;
        let now = self.clock.now_millis();
        let mut pin_next = self.current_track(&party.id).await?.is_none();
        let mut inserted = 0;

        for (index, reference) in references.iter().enumerate() {
            let path = paths::track(party.id.as_str(), &reference.key())?;
            let order = if pin_next {
                PINNED_ORDER
            } else {
                order_key(now, created_at, 0) + index as f64
            };
            let value = serde_json::to_value(TrackDocument {
                reference: reference.clone(),
                vote_count: 0,
                is_fallback: true,
                added_at: Timestamp::server(),
                order,
                played_at: None,
            })?;

            let commit = transaction(self.store.as_ref(), &path, self.max_attempts, |current| {
                Ok(if current.is_some() {
                    TransactionResult::NoOp
                } else {
                    TransactionResult::Put(value.clone())
                })
            })
            .await?;

            if matches!(commit, TransactionCommit::Written { .. }) {
                inserted += 1;
                pin_next = false;
            }
        }

        info!(party = %party.id, inserted, total = references.len(), "seeded fallback tracks");
        Ok(inserted)
    }
}
