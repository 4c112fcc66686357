/// Track domain types
use crate::error::{FestifyError, Result};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Music provider a track reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Spotify,
}

impl Provider {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "spotify" => Some(Self::Spotify),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider-scoped pointer to a playable track
///
/// Two references are equal iff provider and id both match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackReference {
    /// Catalog the id belongs to
    pub provider: Provider,

    /// Provider-specific track id
    pub id: String,
}

impl TrackReference {
    /// Create a reference
    pub fn new(provider: Provider, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
        }
    }

    /// Shorthand for a Spotify track
    pub fn spotify(id: impl Into<String>) -> Self {
        Self::new(Provider::Spotify, id)
    }

    /// Parse a `{provider}-{id}` document key
    ///
    /// The key is split at the first `-`; everything after it is the
    /// provider-scoped id, hyphens included.
    pub fn from_key(key: &str) -> Result<Self> {
        let (provider, id) = key
            .split_once('-')
            .ok_or_else(|| FestifyError::invalid_track_id(format!("missing provider: {key:?}")))?;

        let provider = Provider::from_str(provider).ok_or_else(|| {
            FestifyError::invalid_track_id(format!("unknown provider {provider:?} in {key:?}"))
        })?;

        if id.is_empty() {
            return Err(FestifyError::invalid_track_id(format!(
                "missing track id: {key:?}"
            )));
        }
        if id.contains('/') {
            return Err(FestifyError::invalid_track_id(format!(
                "track id must not contain '/': {key:?}"
            )));
        }

        Ok(Self::new(provider, id))
    }

    /// Document key within a party's track collection
    pub fn key(&self) -> String {
        format!("{}-{}", self.provider, self.id)
    }
}

impl fmt::Display for TrackReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.provider, self.id)
    }
}

/// Queued track as stored at `tracks/{partyId}/{provider}-{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDocument {
    /// Immutable for the life of the document
    pub reference: TrackReference,

    /// Net signed vote count
    pub vote_count: i64,

    /// Inserted from a standing playlist rather than by a vote
    pub is_fallback: bool,

    /// Set once at creation
    pub added_at: Timestamp,

    /// Sort key, ascending
    pub order: f64,

    /// Set when the track is dequeued for playback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<Timestamp>,
}

impl TrackDocument {
    /// Whether the track has been dequeued for playback
    pub fn has_played(&self) -> bool {
        self.played_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_splits_at_first_hyphen() {
        let reference = TrackReference::from_key("spotify-abc-def").unwrap();
        assert_eq!(reference.provider, Provider::Spotify);
        assert_eq!(reference.id, "abc-def");
        assert_eq!(reference.key(), "spotify-abc-def");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for key in ["", "spotify", "spotify-", "deezer-abc", "-abc", "spotify-a/b"] {
            let err = TrackReference::from_key(key).unwrap_err();
            assert!(
                matches!(err, FestifyError::InvalidTrackId(_)),
                "{key:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn equality_needs_provider_and_id() {
        assert_eq!(TrackReference::spotify("a"), TrackReference::spotify("a"));
        assert_ne!(TrackReference::spotify("a"), TrackReference::spotify("b"));
    }

    #[test]
    fn document_wire_format() {
        let doc = TrackDocument {
            reference: TrackReference::spotify("abc"),
            vote_count: 1,
            is_fallback: false,
            added_at: Timestamp::server(),
            order: -9_007_199_254_740_990.0,
            played_at: None,
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "reference": { "provider": "spotify", "id": "abc" },
                "vote_count": 1,
                "is_fallback": false,
                "added_at": { ".sv": "timestamp" },
                "order": -9_007_199_254_740_990.0,
            })
        );

        let parsed: TrackDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn integer_order_reads_as_float() {
        let json = serde_json::json!({
            "reference": { "provider": "spotify", "id": "abc" },
            "vote_count": 2,
            "is_fallback": true,
            "added_at": 5000,
            "order": 4000,
        });
        let parsed: TrackDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.order, 4000.0);
        assert_eq!(parsed.added_at.millis(), Some(5000));
    }
}
