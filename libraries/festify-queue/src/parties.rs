//! Party documents

use festify_core::{
    paths, transaction, DocumentStore, FestifyError, Party, PartyId, Result, TransactionCommit,
    TransactionResult, DEFAULT_MAX_ATTEMPTS,
};
use serde::Deserialize;
use tracing::info;

/// Create `parties/{id}` with a server-assigned `created_at`
///
/// An existing party is returned untouched, so its creation time never moves.
pub async fn create_party(
    store: &dyn DocumentStore,
    id: PartyId,
    name: Option<String>,
) -> Result<Party> {
    if id.is_empty() {
        return Err(FestifyError::invalid_party("missing party id"));
    }
    let path = paths::party(id.as_str())?;
    let value = serde_json::to_value(Party::new(id.clone(), name))?;

    let commit = transaction(store, &path, DEFAULT_MAX_ATTEMPTS, |current| {
        Ok(if current.is_some() {
            TransactionResult::NoOp
        } else {
            TransactionResult::Put(value.clone())
        })
    })
    .await?;

    match commit {
        TransactionCommit::Written { snapshot, .. } => {
            info!(party = %id, "created party");
            parse_party(&path, &snapshot.data)
        }
        TransactionCommit::Unchanged(Some(snapshot)) => parse_party(&path, &snapshot.data),
        TransactionCommit::Unchanged(None) | TransactionCommit::Deleted => Err(
            FestifyError::store(format!("party {id} vanished while being created")),
        ),
    }
}

/// Read `parties/{id}`
pub async fn get_party(store: &dyn DocumentStore, id: &PartyId) -> Result<Option<Party>> {
    if id.is_empty() {
        return Err(FestifyError::invalid_party("missing party id"));
    }
    let path = paths::party(id.as_str())?;

    store
        .get(&path)
        .await?
        .map(|snapshot| parse_party(&path, &snapshot.data))
        .transpose()
}

fn parse_party(path: &str, value: &serde_json::Value) -> Result<Party> {
    Party::deserialize(value).map_err(|e| FestifyError::invalid_document(path, e.to_string()))
}
