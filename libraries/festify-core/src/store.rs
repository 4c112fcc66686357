//! Document store boundary
//!
//! A keyed-document store with per-document versioning. The only mutation
//! primitive the queue relies on for shared documents is
//! [`DocumentStore::compare_and_swap`]; [`transaction`] layers the optimistic
//! read/apply/retry loop on top of it.

use crate::error::{FestifyError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Retry budget used when the caller does not configure one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

/// A document together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// Document body
    pub data: T,

    /// Bumped on every committed write
    pub version: u64,
}

/// Conditional write applied by [`DocumentStore::compare_and_swap`]
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or replace the document
    Put(Value),

    /// Remove the document
    Delete,
}

/// Result of a compare-and-swap
#[derive(Debug, Clone, PartialEq)]
pub enum CasResult {
    /// The write landed; carries the new snapshot, or `None` after a delete
    Committed(Option<Versioned<Value>>),

    /// The document changed since the expected version was read
    Conflict,
}

/// Storage backend for party, track and vote documents
///
/// Paths are slash-separated (`tracks/{party}/{track}`). Implementations
/// replace server timestamp markers (`{".sv": "timestamp"}`) inside written
/// values with their commit time, see [`resolve_server_values`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document
    async fn get(&self, path: &str) -> Result<Option<Versioned<Value>>>;

    /// Immediate children of a collection, as `(key, snapshot)`, sorted by key
    async fn children(&self, path: &str) -> Result<Vec<(String, Versioned<Value>)>>;

    /// Apply `write` only if the document is still at `expected_version`
    ///
    /// `expected_version = None` means the document must not exist.
    async fn compare_and_swap(
        &self,
        path: &str,
        expected_version: Option<u64>,
        write: Write,
    ) -> Result<CasResult>;

    /// Unconditional upsert
    ///
    /// Bypasses versioning; meant for imports and test fixtures. Shared
    /// documents are written through [`transaction`].
    async fn put(&self, path: &str, value: Value) -> Result<Versioned<Value>>;

    /// Unconditional delete; returns whether a document existed
    ///
    /// For documents with a single writer, such as the vote edges of a
    /// track that left the queue.
    async fn delete(&self, path: &str) -> Result<bool>;
}

/// What a transaction update function wants done with the document
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionResult {
    /// Write this value
    Put(Value),

    /// Leave the document untouched
    NoOp,

    /// Remove the document
    Delete,
}

/// How a transaction finished
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionCommit {
    /// A value was written; `created` is true if no document existed before
    Written {
        snapshot: Versioned<Value>,
        created: bool,
    },

    /// The document was removed
    Deleted,

    /// Nothing was written; carries the snapshot the decision was made on
    Unchanged(Option<Versioned<Value>>),
}

/// Run an optimistic single-document transaction
///
/// `update` receives the latest value (or `None`) and may be invoked once per
/// attempt, so it must be a pure function of its input. A `Conflict` from the
/// store triggers a fresh read and another attempt, up to `max_attempts`.
pub async fn transaction<S, F>(
    store: &S,
    path: &str,
    max_attempts: u32,
    update: F,
) -> Result<TransactionCommit>
where
    S: DocumentStore + ?Sized,
    F: Fn(Option<&Value>) -> Result<TransactionResult> + Send + Sync,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let current = store.get(path).await?;
        let expected = current.as_ref().map(|snapshot| snapshot.version);

        let write = match update(current.as_ref().map(|snapshot| &snapshot.data))? {
            TransactionResult::NoOp => return Ok(TransactionCommit::Unchanged(current)),
            TransactionResult::Delete if current.is_none() => {
                return Ok(TransactionCommit::Unchanged(None));
            }
            TransactionResult::Delete => Write::Delete,
            TransactionResult::Put(value) => Write::Put(value),
        };

        match store.compare_and_swap(path, expected, write).await? {
            CasResult::Committed(Some(snapshot)) => {
                return Ok(TransactionCommit::Written {
                    snapshot,
                    created: expected.is_none(),
                });
            }
            CasResult::Committed(None) => return Ok(TransactionCommit::Deleted),
            CasResult::Conflict => {
                debug!(path, attempt, "transaction conflict, retrying");
            }
        }
    }

    warn!(path, max_attempts, "transaction retry budget exhausted");
    Err(FestifyError::TransactionAborted {
        path: path.to_string(),
        attempts: max_attempts,
    })
}

/// Replace every `{".sv": "timestamp"}` marker in `value` with `now_millis`
pub fn resolve_server_values(value: &mut Value, now_millis: i64) {
    if is_server_timestamp(value) {
        *value = Value::from(now_millis);
        return;
    }

    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                resolve_server_values(child, now_millis);
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_server_values(item, now_millis);
            }
        }
        _ => {}
    }
}

fn is_server_timestamp(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        map.len() == 1 && map.get(".sv").and_then(Value::as_str) == Some("timestamp")
    })
}
