//! Integration tests for the in-memory document store and the optimistic
//! transaction wrapper running on top of it.

use async_trait::async_trait;
use festify_core::{
    transaction, CasResult, Clock, DocumentStore, FestifyError, ManualClock, Result,
    TransactionCommit, TransactionResult, Versioned, Write,
};
use festify_storage::MemoryStore;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn store_at(millis: i64) -> MemoryStore {
    MemoryStore::with_clock(Arc::new(ManualClock::new(millis)) as Arc<dyn Clock>)
}

/// Wraps a store and lets another writer sneak in before the first
/// `conflicts` compare-and-swaps.
struct ContendedStore {
    inner: MemoryStore,
    conflicts: AtomicU32,
}

#[async_trait]
impl DocumentStore for ContendedStore {
    async fn get(&self, path: &str) -> Result<Option<Versioned<Value>>> {
        self.inner.get(path).await
    }

    async fn children(&self, path: &str) -> Result<Vec<(String, Versioned<Value>)>> {
        self.inner.children(path).await
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected_version: Option<u64>,
        write: Write,
    ) -> Result<CasResult> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            let current = self.inner.get(path).await?;
            let n = current.and_then(|s| s.data["n"].as_i64()).unwrap_or(0);
            self.inner.put(path, json!({ "n": n + 10 })).await?;
        }
        self.inner.compare_and_swap(path, expected_version, write).await
    }

    async fn put(&self, path: &str, value: Value) -> Result<Versioned<Value>> {
        self.inner.put(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        self.inner.delete(path).await
    }
}

fn increment(current: Option<&Value>) -> Result<TransactionResult> {
    let n = current.and_then(|v| v["n"].as_i64()).unwrap_or(0);
    Ok(TransactionResult::Put(json!({ "n": n + 1 })))
}

#[tokio::test]
async fn test_put_get_and_timestamp_resolution() {
    let store = store_at(7_000);

    let written = store
        .put("parties/p1", json!({ "created_at": { ".sv": "timestamp" } }))
        .await
        .unwrap();
    assert_eq!(written.data, json!({ "created_at": 7_000 }));
    assert_eq!(store.get("parties/p1").await.unwrap(), Some(written));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_children_skip_grandchildren_and_siblings() {
    let store = MemoryStore::new();
    store.put("votes/p1/spotify-a/u1", json!(true)).await.unwrap();
    store.put("votes/p1/spotify-a/u2", json!(true)).await.unwrap();
    store.put("votes/p1/spotify-ab/u3", json!(true)).await.unwrap();
    store.put("votes/p1/spotify-a/u1/extra", json!(1)).await.unwrap();

    let children = store.children("votes/p1/spotify-a").await.unwrap();
    let keys: Vec<&str> = children.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["u1", "u2"]);
}

#[tokio::test]
async fn test_transaction_creates_then_updates() {
    let store = MemoryStore::new();

    let first = transaction(&store, "counters/a", 5, increment).await.unwrap();
    assert!(matches!(first, TransactionCommit::Written { created: true, .. }));

    let second = transaction(&store, "counters/a", 5, increment).await.unwrap();
    let TransactionCommit::Written { snapshot, created } = second else {
        panic!("expected a write");
    };
    assert!(!created);
    assert_eq!(snapshot.data, json!({ "n": 2 }));
}

#[tokio::test]
async fn test_transaction_retries_on_conflict() {
    let store = ContendedStore {
        inner: MemoryStore::new(),
        conflicts: AtomicU32::new(2),
    };
    let calls = AtomicU32::new(0);

    let commit = transaction(&store, "counters/a", 5, |current| {
        calls.fetch_add(1, Ordering::SeqCst);
        increment(current)
    })
    .await
    .unwrap();

    // Two interfering writes of +10 each, then our +1 on the fresh value
    let TransactionCommit::Written { snapshot, .. } = commit else {
        panic!("expected a write");
    };
    assert_eq!(snapshot.data, json!({ "n": 21 }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_transaction_gives_up_after_budget() {
    let store = ContendedStore {
        inner: MemoryStore::new(),
        conflicts: AtomicU32::new(10),
    };

    let err = transaction(&store, "counters/a", 3, increment)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FestifyError::TransactionAborted { ref path, attempts: 3 } if path == "counters/a"
    ));
}

#[tokio::test]
async fn test_noop_and_delete_of_absent_write_nothing() {
    let store = MemoryStore::new();

    let noop = transaction(&store, "a/b", 5, |_| Ok(TransactionResult::NoOp))
        .await
        .unwrap();
    assert_eq!(noop, TransactionCommit::Unchanged(None));

    let delete = transaction(&store, "a/b", 5, |_| Ok(TransactionResult::Delete))
        .await
        .unwrap();
    assert_eq!(delete, TransactionCommit::Unchanged(None));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_transaction_delete_removes_document() {
    let store = MemoryStore::new();
    store.put("a/b", json!({ "n": 1 })).await.unwrap();

    let commit = transaction(&store, "a/b", 5, |_| Ok(TransactionResult::Delete))
        .await
        .unwrap();
    assert_eq!(commit, TransactionCommit::Deleted);
    assert!(store.get("a/b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_errors_abort_without_writing() {
    let store = MemoryStore::new();

    let err = transaction(&store, "a/b", 5, |_| {
        Err(FestifyError::invalid_input("refused"))
    })
    .await
    .unwrap_err();
    assert!(matches!(err, FestifyError::InvalidInput(_)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_transactions_do_not_lose_updates() {
    let store = Arc::new(MemoryStore::new());

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                transaction(store.as_ref(), "counters/shared", 1_000, increment).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let final_value = store.get("counters/shared").await.unwrap().unwrap();
    assert_eq!(final_value.data, json!({ "n": 32 }));
}
