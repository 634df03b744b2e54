use std::sync::Arc;

use mongodb::Client as MongoClient;

use crate::config::Config;
use crate::store::{DocumentStore, MemoryStore, MongoStore};

pub mod assess_service;
pub mod author_service;

pub use assess_service::{AssessService, NO_TESTS_MESSAGE};
pub use author_service::AuthorService;

/// The wired-up engine: both services sharing one document-store handle.
///
/// The process entry point owns connection lifecycle and injects the store
/// here; services never construct their own.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub author: AuthorService,
    pub assess: AssessService,
}

impl AppState {
    /// Wire the engine against MongoDB. Verifies the connection with a ping
    /// before handing out services.
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let db = mongo_client.database(&config.mongo_database);

        tracing::info!(database = %config.mongo_database, "connecting to MongoDB");
        db.run_command(mongodb::bson::doc! { "ping": 1 }).await?;
        tracing::info!("MongoDB connection established");

        Ok(Self::with_store(config, Arc::new(MongoStore::new(db))))
    }

    /// Wire the engine against an in-process store — no database required.
    /// Used by the test suites and by embedders that want the engine
    /// self-contained.
    pub fn in_memory(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            author: AuthorService::new(store.clone()),
            assess: AssessService::new(store.clone()),
            store,
            config,
        }
    }
}
