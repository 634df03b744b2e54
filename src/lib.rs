//! Backend core of a test authoring-and-taking platform: schema-validated
//! document CRUD, the test-availability state machine, and the
//! answer-scoring/feedback pipeline. HTTP routing, templating and session
//! handling are external collaborators that drive [`AppState`].

pub mod config;
pub mod error;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{ServiceError, StoreError};
pub use services::{AppState, AssessService, AuthorService, NO_TESTS_MESSAGE};
pub use store::{DocumentStore, MemoryStore, MongoStore, Select, Target};
