//! In-process implementation of [`DocumentStore`].
//!
//! Collections are `BTreeMap<ObjectId, Document>`; object ids are generated
//! monotonically, so map order is creation order. Used by the test suites and
//! by embedders that want the engine without a database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use indexmap::IndexMap;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::error::StoreError;

use super::{
    documents_from_payload, equality_filter, require_collection, update_arguments, DocumentStore,
    Select, Target,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<ObjectId, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, payload: Bson) -> Result<Vec<ObjectId>, StoreError> {
        require_collection(collection)?;
        let documents = documents_from_payload(payload)?;

        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = document
                .get_object_id("_id")
                .unwrap_or_else(|_| ObjectId::new());
            document.insert("_id", id);
            entries.insert(id, document);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn read(
        &self,
        collection: &str,
        select: Select,
    ) -> Result<IndexMap<ObjectId, Document>, StoreError> {
        require_collection(collection)?;
        let filter = match select {
            Select::All => None,
            Select::Where(conditions) => Some(equality_filter(conditions)?),
        };

        let collections = self.collections.read().await;
        let Some(entries) = collections.get(collection) else {
            return Ok(IndexMap::new());
        };
        Ok(entries
            .iter()
            .filter(|(_, document)| filter.as_ref().map_or(true, |f| matches(document, f)))
            .map(|(id, document)| (*id, document.clone()))
            .collect())
    }

    async fn update(
        &self,
        collection: &str,
        conditions: Bson,
        update: Bson,
    ) -> Result<u64, StoreError> {
        require_collection(collection)?;
        let (conditions, update) = update_arguments(conditions, update)?;

        let mut collections = self.collections.write().await;
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut matched = 0;
        for document in entries.values_mut() {
            if matches(document, &conditions) {
                for (key, value) in update.iter() {
                    document.insert(key, value.clone());
                }
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn delete(&self, collection: &str, target: Target) -> Result<(), StoreError> {
        require_collection(collection)?;
        match target {
            Target::Collection => {
                self.collections.write().await.remove(collection);
            }
            Target::Where(conditions) => {
                let filter = equality_filter(conditions)?;
                let mut collections = self.collections.write().await;
                if let Some(entries) = collections.get_mut(collection) {
                    entries.retain(|_, document| !matches(document, &filter));
                }
            }
        }
        Ok(())
    }
}
