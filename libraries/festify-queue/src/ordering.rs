//! Closed-form order keys
//!
//! The queue is never stored as an explicit index. Each track document
//! carries an `order` key and the store lists a party's tracks ascending by
//! it, so a vote only ever rewrites the one document it touches.
//!
//! ```text
//! order = (added_at - party.created_at) - vote_count * VOTE_FACTOR
//! ```
//!
//! The time term is bounded by the real milliseconds a party has been
//! running, far below `VOTE_FACTOR`, so one extra vote outweighs any
//! difference in insertion time while equal vote counts fall back to
//! insertion order. The track that is currently playing is pinned to
//! `PINNED_ORDER`, below anything a vote count can produce.
//!
//! This is a heuristic, not a proven total order. The constants are part of
//! the stored data format and must not change.

use festify_core::{FestifyError, Result, Timestamp, TrackDocument, TrackReference};

/// Weight of one vote in the order key
pub const VOTE_FACTOR: f64 = 1e12;

/// Smallest integer exactly representable in an `f64`, `-(2^53 - 1)`
pub const MIN_SAFE_INTEGER: f64 = -9_007_199_254_740_991.0;

/// Order key of the currently playing track
pub const PINNED_ORDER: f64 = MIN_SAFE_INTEGER + 1.0;

/// Order key for a non-playing track
pub fn order_key(added_at: i64, party_created_at: i64, vote_count: i64) -> f64 {
    (added_at - party_created_at) as f64 - vote_count as f64 * VOTE_FACTOR
}

/// Fixed inputs to one ordering decision
///
/// Everything here is sampled before the transaction starts, so the decision
/// is a pure function of the document it is handed.
#[derive(Debug, Clone, Copy)]
pub struct VoteInput<'a> {
    /// Reference parsed from the track key being voted on
    pub reference: &'a TrackReference,

    /// `+1`, `-1`, or `0` for a plain re-key
    pub vote_delta: i64,

    /// Track the party is playing right now, if any
    pub current_track: Option<&'a TrackReference>,

    /// Resolved `Party::created_at`
    pub party_created_at: i64,

    /// Wall-clock time of the vote
    pub now: i64,
}

/// What should happen to the track document
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDecision {
    /// No document existed; write this one
    Insert(TrackDocument),

    /// Replace the document with this one
    Update(TrackDocument),

    /// The stored order is already correct
    Unchanged,

    /// Remove the document
    Remove,
}

/// Decide the new state of a track document
pub fn decide(existing: Option<&TrackDocument>, input: &VoteInput<'_>) -> Result<OrderDecision> {
    let reference = existing.map_or(input.reference, |doc| &doc.reference);
    let currently_playing = input.current_track == Some(reference);
    let new_vote_count = existing.map_or(0, |doc| doc.vote_count) + input.vote_delta;

    match existing {
        None if new_vote_count > 0 => {
            let order = if input.current_track.is_none() {
                PINNED_ORDER
            } else {
                order_key(input.now, input.party_created_at, new_vote_count)
            };

            Ok(OrderDecision::Insert(TrackDocument {
                reference: input.reference.clone(),
                vote_count: new_vote_count,
                is_fallback: false,
                added_at: Timestamp::server(),
                order,
                played_at: None,
            }))
        }
        Some(doc) if new_vote_count > 0 || currently_playing || doc.is_fallback => {
            let order = if currently_playing {
                PINNED_ORDER
            } else {
                let added_at = doc.added_at.millis().ok_or_else(|| {
                    FestifyError::invalid_document(reference.key(), "added_at is unresolved")
                })?;
                order_key(added_at, input.party_created_at, new_vote_count)
            };

            if doc.order == order {
                return Ok(OrderDecision::Unchanged);
            }

            let mut updated = doc.clone();
            updated.order = order;
            // The playing track keeps its count; only its key is pinned
            if !currently_playing {
                updated.vote_count = new_vote_count;
            }
            Ok(OrderDecision::Update(updated))
        }
        _ => Ok(OrderDecision::Remove),
    }
}
