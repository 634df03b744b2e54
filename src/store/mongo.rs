//! MongoDB-backed implementation of [`DocumentStore`].
//!
//! A thin translation layer: argument validation is shared with the in-memory
//! implementation, identifiers are assigned client-side so `create` can
//! return them, and updates go through `$set` to get wholesale top-level
//! field replacement.

use async_trait::async_trait;
use futures::TryStreamExt;
use indexmap::IndexMap;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Collection, Database};

use crate::error::StoreError;

use super::{
    documents_from_payload, equality_filter, require_collection, update_arguments, DocumentStore,
    Select, Target,
};

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn create(&self, collection: &str, payload: Bson) -> Result<Vec<ObjectId>, StoreError> {
        require_collection(collection)?;
        let mut documents = documents_from_payload(payload)?;

        let mut ids = Vec::with_capacity(documents.len());
        for document in &mut documents {
            let id = document
                .get_object_id("_id")
                .unwrap_or_else(|_| ObjectId::new());
            document.insert("_id", id);
            ids.push(id);
        }

        self.collection(collection).insert_many(documents).await?;
        Ok(ids)
    }

    async fn read(
        &self,
        collection: &str,
        select: Select,
    ) -> Result<IndexMap<ObjectId, Document>, StoreError> {
        require_collection(collection)?;
        let filter = match select {
            Select::All => Document::new(),
            Select::Where(conditions) => equality_filter(conditions)?,
        };

        let documents: Vec<Document> = self
            .collection(collection)
            .find(filter)
            .sort(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;

        documents
            .into_iter()
            .map(|document| {
                let id = document
                    .get_object_id("_id")
                    .map_err(|_| StoreError::MissingId)?;
                Ok((id, document))
            })
            .collect()
    }

    async fn update(
        &self,
        collection: &str,
        conditions: Bson,
        update: Bson,
    ) -> Result<u64, StoreError> {
        require_collection(collection)?;
        let (conditions, update) = update_arguments(conditions, update)?;

        let result = self
            .collection(collection)
            .update_many(conditions, doc! { "$set": update })
            .await?;
        Ok(result.matched_count)
    }

    async fn delete(&self, collection: &str, target: Target) -> Result<(), StoreError> {
        require_collection(collection)?;
        match target {
            Target::Collection => self.collection(collection).drop().await?,
            Target::Where(conditions) => {
                let filter = equality_filter(conditions)?;
                self.collection(collection).delete_many(filter).await?;
            }
        }
        Ok(())
    }
}
