use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Group document in the `groups` collection: a named set of student ids used
/// to batch-register students on a test. Maintained by external
/// collaborators; this crate only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}
