//! Turns vote-change events into ordering transactions

use crate::engine::{EngineConfig, OrderingEngine, VoteOutcome};
use crate::parties;
use crate::queue::{PartyQueue, QueueEntry};
use crate::votes::VoteLedger;
use festify_core::{Clock, DocumentStore, FestifyError, PartyId, Result, UserId, VoteEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Counters for a drained event stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Events received, successful or not
    pub processed: usize,

    /// Events that returned an error
    pub failed: usize,
}

/// Resolves the party and playing track for each event and runs the engine
#[derive(Clone)]
pub struct VoteDispatcher {
    store: Arc<dyn DocumentStore>,
    engine: OrderingEngine,
    queue: PartyQueue,
    ledger: VoteLedger,
}

impl VoteDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            engine: OrderingEngine::new(store.clone(), clock.clone(), config),
            queue: PartyQueue::new(store.clone(), clock, config.max_attempts),
            ledger: VoteLedger::new(store.clone(), config.max_attempts),
            store,
        }
    }

    pub fn engine(&self) -> &OrderingEngine {
        &self.engine
    }

    pub fn queue(&self) -> &PartyQueue {
        &self.queue
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    /// Record one user's vote and apply it to the queue
    ///
    /// Returns `None` when the user's vote already had that state. If the
    /// vote cannot be applied the edge is flipped back, so a retry of the
    /// same vote produces the event again.
    pub async fn vote(
        &self,
        party_id: &PartyId,
        track_id: &str,
        user_id: &UserId,
        vote: bool,
    ) -> Result<Option<VoteOutcome>> {
        let Some(event) = self
            .ledger
            .set_vote(party_id, track_id, user_id, vote)
            .await?
        else {
            return Ok(None);
        };

        match self.dispatch(&event).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                match self.ledger.revert(&event).await {
                    Ok(_) => debug!(
                        party = %party_id,
                        track = track_id,
                        user = %user_id,
                        "reverted vote edge"
                    ),
                    Err(revert_err) => error!(
                        party = %party_id,
                        track = track_id,
                        user = %user_id,
                        "failed to revert vote edge: {}", revert_err
                    ),
                }
                Err(e)
            }
        }
    }

    /// Finish a played track and move the queue on
    ///
    /// Stamps `played_at`, takes the track and its votes out of the queue and
    /// pins the new head. Returns the track now playing, if any.
    pub async fn complete_track(
        &self,
        party_id: &PartyId,
        track_id: &str,
    ) -> Result<Option<QueueEntry>> {
        let party = parties::get_party(self.store.as_ref(), party_id)
            .await?
            .ok_or_else(|| FestifyError::invalid_party(format!("party {party_id} not found")))?;

        if self.queue.mark_played(party_id, track_id).await?.is_some()
            && self.queue.remove_played(party_id, track_id).await?
        {
            self.ledger.clear_track(party_id, track_id).await?;
            info!(party = %party_id, track = track_id, "track finished");
        }

        let Some(head) = self.queue.current_track(party_id).await? else {
            return Ok(None);
        };
        self.engine
            .reorder(
                party_id,
                &head.key,
                Some(&head.track.reference),
                Some(&party),
            )
            .await?;

        self.queue.current_track(party_id).await
    }

    /// Process one vote event
    pub async fn dispatch(&self, event: &VoteEvent) -> Result<VoteOutcome> {
        if event.party_id.is_empty() {
            return Err(FestifyError::invalid_party("missing party id"));
        }

        let party = parties::get_party(self.store.as_ref(), &event.party_id).await?;
        let current = self.queue.current_track(&event.party_id).await?;

        let outcome = self
            .engine
            .apply_vote(
                &event.party_id,
                &event.track_id,
                event.delta(),
                current.as_ref().map(|entry| &entry.track.reference),
                party.as_ref(),
            )
            .await?;

        info!(
            party = %event.party_id,
            track = %event.track_id,
            user = %event.user_id,
            vote = event.vote,
            outcome = outcome.as_str(),
            "processed vote"
        );

        Ok(outcome)
    }

    /// Drain `events` until every sender is dropped
    ///
    /// A failing event is logged and counted; it never stops the loop.
    pub async fn run(&self, mut events: mpsc::Receiver<VoteEvent>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        while let Some(event) = events.recv().await {
            summary.processed += 1;
            if let Err(e) = self.dispatch(&event).await {
                summary.failed += 1;
                if e.is_validation() {
                    warn!(
                        party = %event.party_id,
                        track = %event.track_id,
                        user = %event.user_id,
                        "rejected vote: {}", e
                    );
                } else {
                    error!(
                        party = %event.party_id,
                        track = %event.track_id,
                        user = %event.user_id,
                        "failed to process vote: {}", e
                    );
                }
            }
        }

        debug!(
            processed = summary.processed,
            failed = summary.failed,
            "vote stream closed"
        );
        summary
    }
}
