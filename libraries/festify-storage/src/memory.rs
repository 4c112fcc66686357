//! In-process document store

use async_trait::async_trait;
use festify_core::{
    paths, resolve_server_values, CasResult, Clock, DocumentStore, Result, SystemClock,
    Versioned, Write,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, Versioned<Value>>,
    /// Store-wide sequence, so a re-created document never reuses a version
    next_version: u64,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

/// Document store held in memory
///
/// The lock is only held inside a single read or conditional write, never
/// across a transaction's update function.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store stamping commits with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping commits with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            clock,
        }
    }

    /// Number of live documents
    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    /// Whether the store holds no documents
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.documents.is_empty()
    }

    fn stamp(&self, mut value: Value) -> Value {
        resolve_server_values(&mut value, self.clock.now_millis());
        value
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Versioned<Value>>> {
        Ok(self.inner.read().await.documents.get(path).cloned())
    }

    async fn children(&self, path: &str) -> Result<Vec<(String, Versioned<Value>)>> {
        let prefix = format!("{path}/");
        let inner = self.inner.read().await;

        Ok(inner
            .documents
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| paths::parent(key) == path)
            .map(|(key, snapshot)| (paths::key(key).to_string(), snapshot.clone()))
            .collect())
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected_version: Option<u64>,
        write: Write,
    ) -> Result<CasResult> {
        let mut inner = self.inner.write().await;

        let current = inner.documents.get(path).map(|snapshot| snapshot.version);
        if current != expected_version {
            return Ok(CasResult::Conflict);
        }

        match write {
            Write::Put(value) => {
                let snapshot = Versioned {
                    data: self.stamp(value),
                    version: inner.bump(),
                };
                inner.documents.insert(path.to_string(), snapshot.clone());
                Ok(CasResult::Committed(Some(snapshot)))
            }
            Write::Delete => {
                inner.documents.remove(path);
                inner.bump();
                Ok(CasResult::Committed(None))
            }
        }
    }

    async fn put(&self, path: &str, value: Value) -> Result<Versioned<Value>> {
        let mut inner = self.inner.write().await;
        let snapshot = Versioned {
            data: self.stamp(value),
            version: inner.bump(),
        };
        inner.documents.insert(path.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let existed = inner.documents.remove(path).is_some();
        if existed {
            inner.bump();
        }
        Ok(existed)
    }
}
