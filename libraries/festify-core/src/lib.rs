//! Festify Core
//!
//! Shared domain types, traits, and error handling for the Festify party
//! queue.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Party`, `TrackReference`, `TrackDocument`, `VoteEvent`
//! - **Store Boundary**: the `DocumentStore` trait and the optimistic
//!   `transaction` wrapper built on its compare-and-swap primitive
//! - **Error Handling**: Unified `FestifyError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use festify_core::types::{Provider, TrackReference};
//!
//! let reference = TrackReference::from_key("spotify-4uLU6hMCjMI75M1A2tKUQC").unwrap();
//! assert_eq!(reference.provider, Provider::Spotify);
//! assert_eq!(reference.key(), "spotify-4uLU6hMCjMI75M1A2tKUQC");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod paths;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FestifyError, Result};
pub use store::{
    resolve_server_values, transaction, CasResult, DocumentStore, TransactionCommit,
    TransactionResult, Versioned, Write, DEFAULT_MAX_ATTEMPTS,
};

pub use types::{
    Party, PartyId, Provider, ServerValue, Timestamp, TrackDocument, TrackReference, UserId,
    VoteEvent,
};
