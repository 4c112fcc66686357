//! Document paths
//!
//! Keys follow the external store's layout:
//!
//! ```text
//! parties/{partyId}
//! tracks/{partyId}/{provider}-{id}
//! votes/{partyId}/{provider}-{id}/{userId}
//! ```

use crate::error::{FestifyError, Result};

/// Root collection of party documents
pub const PARTIES: &str = "parties";

/// Root collection of per-party track collections
pub const TRACKS: &str = "tracks";

/// Root collection of per-party vote edges
pub const VOTES: &str = "votes";

fn segment<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(FestifyError::invalid_input(format!("{kind} must not be empty")));
    }
    if value.contains('/') {
        return Err(FestifyError::invalid_input(format!(
            "{kind} must not contain '/': {value}"
        )));
    }
    Ok(value)
}

/// `parties/{party}`
pub fn party(party: &str) -> Result<String> {
    Ok(format!("{PARTIES}/{}", segment("party id", party)?))
}

/// `tracks/{party}`
pub fn tracks(party: &str) -> Result<String> {
    Ok(format!("{TRACKS}/{}", segment("party id", party)?))
}

/// `tracks/{party}/{track}`
pub fn track(party: &str, track: &str) -> Result<String> {
    Ok(format!("{}/{}", tracks(party)?, segment("track id", track)?))
}

/// `votes/{party}/{track}`
pub fn votes(party: &str, track: &str) -> Result<String> {
    Ok(format!(
        "{VOTES}/{}/{}",
        segment("party id", party)?,
        segment("track id", track)?
    ))
}

/// `votes/{party}/{track}/{user}`
pub fn vote(party: &str, track: &str, user: &str) -> Result<String> {
    Ok(format!("{}/{}", votes(party, track)?, segment("user id", user)?))
}

/// Parent collection of `path`, or `""` for a root-level key
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Last segment of `path`
pub fn key(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, key)| key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_paths() {
        assert_eq!(party("p1").unwrap(), "parties/p1");
        assert_eq!(track("p1", "spotify-abc").unwrap(), "tracks/p1/spotify-abc");
        assert_eq!(
            vote("p1", "spotify-abc", "u1").unwrap(),
            "votes/p1/spotify-abc/u1"
        );
    }

    #[test]
    fn rejects_empty_and_nested_segments() {
        assert!(party("").is_err());
        assert!(track("p1", "a/b").is_err());
        assert!(vote("p1", "spotify-abc", "").is_err());
    }

    #[test]
    fn parent_and_key() {
        assert_eq!(parent("tracks/p1/spotify-abc"), "tracks/p1");
        assert_eq!(key("tracks/p1/spotify-abc"), "spotify-abc");
        assert_eq!(parent("parties"), "");
        assert_eq!(key("parties"), "parties");
    }
}
