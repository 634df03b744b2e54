//! The document-store adapter: generic CRUD against a fixed set of named
//! collections. Services depend on the [`DocumentStore`] trait and never talk
//! to the storage engine directly; [`mongo::MongoStore`] backs it with a
//! MongoDB database and [`memory::MemoryStore`] keeps everything in process.
//!
//! All argument validation happens here, before any backend is touched, so
//! both implementations reject the same calls with the same [`StoreError`].

use async_trait::async_trait;
use indexmap::IndexMap;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::error::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// The only collection names the adapter will operate on.
pub const VALID_COLLECTIONS: &[&str] = &["users", "questions", "tests", "groups", "samples"];

/// Document selection for reads: everything, or an equality filter.
#[derive(Debug, Clone)]
pub enum Select {
    /// The "all documents" sentinel.
    All,
    /// An equality-filter document: every key/value pair must match exactly.
    Where(Bson),
}

/// Deletion target: documents matching an equality filter, or the whole
/// collection.
#[derive(Debug, Clone)]
pub enum Target {
    Where(Bson),
    /// The "drop collection" sentinel: removes every document.
    Collection,
}

/// Generic create/read/update/delete over named collections.
///
/// Each operation is atomic per call from the caller's perspective. Top-level
/// fields are updated wholesale: mutating a nested value means reading the
/// document, editing the field in memory and writing the whole field back.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a single document or an ordered sequence of documents.
    /// Returns the assigned identifiers in insertion order.
    async fn create(&self, collection: &str, payload: Bson) -> Result<Vec<ObjectId>, StoreError>;

    /// Read documents, keyed by identifier, in creation order.
    async fn read(
        &self,
        collection: &str,
        select: Select,
    ) -> Result<IndexMap<ObjectId, Document>, StoreError>;

    /// Replace the given top-level fields on every matching document.
    /// Returns the number of matched documents.
    async fn update(
        &self,
        collection: &str,
        conditions: Bson,
        update: Bson,
    ) -> Result<u64, StoreError>;

    /// Delete matching documents, or drop the collection outright.
    async fn delete(&self, collection: &str, target: Target) -> Result<(), StoreError>;
}

pub(crate) fn require_collection(name: &str) -> Result<(), StoreError> {
    if VALID_COLLECTIONS.contains(&name) {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

/// A payload is one document or a non-empty array of documents.
pub(crate) fn documents_from_payload(payload: Bson) -> Result<Vec<Document>, StoreError> {
    match payload {
        Bson::Document(doc) => Ok(vec![doc]),
        Bson::Array(items) if !items.is_empty() => items
            .into_iter()
            .map(|item| match item {
                Bson::Document(doc) => Ok(doc),
                _ => Err(StoreError::InvalidDocumentShape),
            })
            .collect(),
        _ => Err(StoreError::InvalidDocumentShape),
    }
}

/// Conditions must be a document of plain equality matches: no `$`-operator
/// keys at the top level or inside nested filter documents.
pub(crate) fn equality_filter(conditions: Bson) -> Result<Document, StoreError> {
    match conditions {
        Bson::Document(doc) if is_plain(&doc) => Ok(doc),
        _ => Err(StoreError::InvalidConditions),
    }
}

/// Update calls need two non-empty documents; the update body may not smuggle
/// in operator keys.
pub(crate) fn update_arguments(
    conditions: Bson,
    update: Bson,
) -> Result<(Document, Document), StoreError> {
    let (Bson::Document(conditions), Bson::Document(update)) = (conditions, update) else {
        return Err(StoreError::InvalidUpdateArguments);
    };
    if conditions.is_empty() || update.is_empty() || !is_plain(&conditions) || !is_plain(&update) {
        return Err(StoreError::InvalidUpdateArguments);
    }
    Ok((conditions, update))
}

fn is_plain(doc: &Document) -> bool {
    doc.iter().all(|(key, value)| {
        !key.starts_with('$')
            && match value {
                Bson::Document(nested) => is_plain(nested),
                _ => true,
            }
    })
}
