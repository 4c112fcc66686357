//! Integration tests for the ordering engine against a real store


use async_trait::async_trait;
use festify_core::{
    CasResult, Clock, DocumentStore, FestifyError, ManualClock, Party, PartyId, Result, Timestamp,
    TrackReference, Versioned, Write,
};
use festify_queue::{
    ordering::order_key, EngineConfig, OrderingEngine, VoteOutcome, PINNED_ORDER,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_helpers::{voted_track, Fixture, CREATED_AT};

/// Counts every access and fails it with a fixed message
#[derive(Default)]
struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FestifyError::store("permission denied"))
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get(&self, _path: &str) -> Result<Option<Versioned<Value>>> {
        self.fail()
    }

    async fn children(&self, _path: &str) -> Result<Vec<(String, Versioned<Value>)>> {
        self.fail()
    }

    async fn compare_and_swap(
        &self,
        _path: &str,
        _expected_version: Option<u64>,
        _write: Write,
    ) -> Result<CasResult> {
        self.fail()
    }

    async fn put(&self, _path: &str, _value: Value) -> Result<Versioned<Value>> {
        self.fail()
    }

    async fn delete(&self, _path: &str) -> Result<bool> {
        self.fail()
    }
}

fn failing_engine() -> (Arc<FailingStore>, OrderingEngine) {
    let store = Arc::new(FailingStore::default());
    let engine = OrderingEngine::new(
        store.clone(),
        Arc::new(ManualClock::new(CREATED_AT)) as Arc<dyn Clock>,
        EngineConfig::default(),
    );
    (store, engine)
}

fn resolved_party(id: &str) -> Party {
    Party {
        id: PartyId::new(id),
        name: None,
        created_at: Some(Timestamp::Millis(CREATED_AT)),
    }
}

#[tokio::test]
async fn test_first_vote_on_empty_queue_pins_track() {
    let fx = Fixture::new().await;
    fx.clock.set(4_200);

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", 1, None, Some(&fx.party))
        .await
        .unwrap();

    let VoteOutcome::Inserted(doc) = outcome else {
        panic!("expected insert, got {outcome:?}");
    };
    assert_eq!(doc.reference, TrackReference::spotify("abc"));
    assert_eq!(doc.vote_count, 1);
    assert_eq!(doc.order, PINNED_ORDER);
    assert_eq!(doc.added_at, Timestamp::Millis(4_200));
    assert!(!doc.is_fallback);
    assert_eq!(fx.track("spotify-abc").await, Some(doc));
}

#[tokio::test]
async fn test_vote_behind_playing_track() {
    let fx = Fixture::new().await;
    let playing = TrackReference::spotify("playing");
    fx.clock.set(9_000);

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", 1, Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    let doc = outcome.document().unwrap();
    assert_eq!(doc.order, order_key(9_000, CREATED_AT, 1));
    assert_eq!(doc.added_at, Timestamp::Millis(9_000));
}

#[tokio::test]
async fn test_additional_vote_on_queued_track() {
    let fx = Fixture::new().await;
    fx.seed_track(&voted_track("xyz", 2, 5_000)).await;
    let playing = TrackReference::spotify("other");
    fx.clock.set(50_000);

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-xyz", 1, Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    let VoteOutcome::Updated(doc) = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert_eq!(doc.vote_count, 3);
    assert_eq!(doc.order, -2_999_999_996_000.0);
    // Insertion time is kept, not replaced by the vote time
    assert_eq!(doc.added_at, Timestamp::Millis(5_000));
}

#[tokio::test]
async fn test_retracting_last_vote_on_playing_track_keeps_it() {
    let fx = Fixture::new().await;
    fx.seed_track(&voted_track("abc", 1, 2_000)).await;
    let playing = TrackReference::spotify("abc");

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", -1, Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    let VoteOutcome::Updated(doc) = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert_eq!(doc.order, PINNED_ORDER);
    assert_eq!(doc.vote_count, 1);
    assert!(fx.track("spotify-abc").await.is_some());
}

#[tokio::test]
async fn test_replay_on_playing_track_is_noop() {
    let fx = Fixture::new().await;
    let playing = TrackReference::spotify("abc");

    let first = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", 1, None, Some(&fx.party))
        .await
        .unwrap();
    assert!(matches!(first, VoteOutcome::Inserted(_)));
    let before = fx.track("spotify-abc").await;

    for delta in [1, 1, -1] {
        let replay = fx
            .engine()
            .apply_vote(&fx.party.id, "spotify-abc", delta, Some(&playing), Some(&fx.party))
            .await
            .unwrap();
        assert_eq!(replay, VoteOutcome::Unchanged);
    }
    assert_eq!(fx.track("spotify-abc").await, before);
}

#[tokio::test]
async fn test_last_vote_removes_ordinary_track() {
    let fx = Fixture::new().await;
    fx.seed_track(&voted_track("abc", 1, 2_000)).await;
    let playing = TrackReference::spotify("other");

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", -1, Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Removed);
    assert_eq!(fx.track("spotify-abc").await, None);
}

#[tokio::test]
async fn test_retraction_on_missing_track_writes_nothing() {
    let fx = Fixture::new().await;
    let playing = TrackReference::spotify("other");

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", -1, Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    assert_eq!(outcome, VoteOutcome::Unchanged);
    assert_eq!(fx.track("spotify-abc").await, None);
}

#[tokio::test]
async fn test_fallback_track_survives_retraction() {
    let fx = Fixture::new().await;
    let mut doc = voted_track("abc", 1, 2_000);
    doc.is_fallback = true;
    fx.seed_track(&doc).await;
    let playing = TrackReference::spotify("other");

    let outcome = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", -1, Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    let stored = fx.track("spotify-abc").await.unwrap();
    assert_eq!(outcome, VoteOutcome::Updated(stored.clone()));
    assert_eq!(stored.vote_count, 0);
    assert_eq!(stored.order, order_key(2_000, CREATED_AT, 0));
}

#[tokio::test]
async fn test_reorder_unpins_previous_head() {
    let fx = Fixture::new().await;
    let mut doc = voted_track("abc", 3, 2_000);
    doc.order = PINNED_ORDER;
    fx.seed_track(&doc).await;
    let playing = TrackReference::spotify("next");

    let outcome = fx
        .engine()
        .reorder(&fx.party.id, "spotify-abc", Some(&playing), Some(&fx.party))
        .await
        .unwrap();

    let doc = outcome.document().unwrap();
    assert_eq!(doc.vote_count, 3);
    assert_eq!(doc.order, order_key(2_000, CREATED_AT, 3));

    // Already correct, so a second pass writes nothing
    let again = fx
        .engine()
        .reorder(&fx.party.id, "spotify-abc", Some(&playing), Some(&fx.party))
        .await
        .unwrap();
    assert_eq!(again, VoteOutcome::Unchanged);
}

#[tokio::test]
async fn test_malformed_track_document_is_invalid_document() {
    let fx = Fixture::new().await;
    let mut value = serde_json::to_value(voted_track("abc", 2, 2_000)).unwrap();
    value["added_at"] = serde_json::json!("yesterday");
    fx.store
        .put("tracks/party-1/spotify-abc", value)
        .await
        .unwrap();
    let playing = TrackReference::spotify("other");

    let err = fx
        .engine()
        .apply_vote(&fx.party.id, "spotify-abc", 1, Some(&playing), Some(&fx.party))
        .await
        .unwrap_err();

    assert!(matches!(err, FestifyError::InvalidDocument { .. }));
}

#[tokio::test]
async fn test_validation_happens_before_store_access() {
    let (store, engine) = failing_engine();
    let party = resolved_party("p1");
    let no_created_at = Party {
        created_at: None,
        ..resolved_party("p1")
    };

    let err = engine
        .apply_vote(&PartyId::new(""), "spotify-abc", 1, None, Some(&party))
        .await
        .unwrap_err();
    assert!(matches!(err, FestifyError::InvalidParty(_)));

    let err = engine
        .apply_vote(&party.id, "spotify-abc", 1, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FestifyError::InvalidParty(_)));

    let err = engine
        .apply_vote(&party.id, "spotify-abc", 1, None, Some(&no_created_at))
        .await
        .unwrap_err();
    assert!(matches!(err, FestifyError::InvalidParty(_)));

    for track_id in ["", "abc", "deezer-abc", "spotify-", "spotify-a/b"] {
        let err = engine
            .apply_vote(&party.id, track_id, 1, None, Some(&party))
            .await
            .unwrap_err();
        assert!(
            matches!(err, FestifyError::InvalidTrackId(_)),
            "{track_id:?} gave {err:?}"
        );
    }

    let err = engine
        .apply_vote(&party.id, "spotify-abc", 2, None, Some(&party))
        .await
        .unwrap_err();
    assert!(matches!(err, FestifyError::InvalidInput(_)));

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_errors_propagate_unchanged() {
    let (store, engine) = failing_engine();
    let party = resolved_party("p1");

    let err = engine
        .apply_vote(&party.id, "spotify-abc", 1, None, Some(&party))
        .await
        .unwrap_err();

    match err {
        FestifyError::Store(message) => assert_eq!(message, "permission denied"),
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}
