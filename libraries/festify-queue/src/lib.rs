//! Festify - Queue Ordering
//!
//! Vote-driven queue ordering for a party's shared track list.
//!
//! This crate provides:
//! - Closed-form order keys (`ordering`)
//! - The `OrderingEngine`, which applies a vote to one track document in a
//!   single optimistic transaction
//! - `VoteDispatcher`, which resolves the party and playing track for a
//!   `VoteEvent` and runs the engine, one event or a whole channel at a time,
//!   and moves the queue on once a track has played
//! - `VoteLedger` for per-user vote edges
//! - `PartyQueue` for listing the queue, marking tracks played and seeding
//!   fallback tracks
//!
//! # Architecture
//!
//! Nothing here holds global state or locks. Every component is built
//! around an injected `Arc<dyn DocumentStore>`; concurrent voters are kept
//! consistent purely by the store's per-document compare-and-swap.
//!
//! # Example
//!
//! ```rust,no_run
//! use festify_core::{DocumentStore, PartyId, SystemClock, UserId};
//! use festify_queue::{parties, EngineConfig, VoteDispatcher};
//! use std::sync::Arc;
//!
//! # async fn example(store: Arc<dyn DocumentStore>) -> festify_core::Result<()> {
//! let party = parties::create_party(store.as_ref(), PartyId::new("p1"), None).await?;
//!
//! let dispatcher = VoteDispatcher::new(store, Arc::new(SystemClock), EngineConfig::default());
//!
//! dispatcher
//!     .vote(&party.id, "spotify-4uLU6hMCjMI75M1A2tKUQC", &UserId::new("guest"), true)
//!     .await?;
//!
//! for entry in dispatcher.queue().tracks(&party.id).await? {
//!     println!("{} ({} votes)", entry.key, entry.track.vote_count);
//! }
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod engine;
pub mod ordering;
pub mod parties;
mod queue;
mod votes;

// Public exports
pub use dispatcher::{DispatchSummary, VoteDispatcher};
pub use engine::{EngineConfig, OrderingEngine, VoteOutcome};
pub use ordering::{OrderDecision, MIN_SAFE_INTEGER, PINNED_ORDER, VOTE_FACTOR};
pub use queue::{PartyQueue, QueueEntry};
pub use votes::VoteLedger;
