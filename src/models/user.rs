use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// User document in the `users` collection. Users are created and
/// authenticated by external collaborators; this crate only reads them, so
/// the model tolerates extra fields those collaborators may store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Assessor,
    Student,
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Assessor => "assessor",
            AccountType::Student => "student",
        }
    }
}
