//! Domain types

mod ids;
mod party;
mod timestamp;
mod track;
mod vote;

pub use ids::{PartyId, UserId};
pub use party::Party;
pub use timestamp::{ServerValue, Timestamp};
pub use track::{Provider, TrackDocument, TrackReference};
pub use vote::VoteEvent;
