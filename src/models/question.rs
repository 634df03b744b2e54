use std::collections::BTreeMap;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Question document in the `questions` collection, tagged by its schema
/// kind. The variant field lists mirror the tables in [`crate::schema`]:
/// undeclared fields fail deserialization, so a document that decodes is
/// schema-conforming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum Question {
    #[serde(rename = "boolean")]
    Boolean(BooleanQuestion),
}

impl Question {
    pub fn kind(&self) -> &'static str {
        match self {
            Question::Boolean(_) => "boolean",
        }
    }

    pub fn author(&self) -> ObjectId {
        match self {
            Question::Boolean(question) => question.author,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Question::Boolean(question) => &question.name,
        }
    }

    pub fn statement(&self) -> &str {
        match self {
            Question::Boolean(question) => &question.statement,
        }
    }

    pub fn feedback(&self) -> &str {
        match self {
            Question::Boolean(question) => &question.feedback,
        }
    }

    /// Per-student scoring records, keyed by student id.
    pub fn taken(&self) -> Option<&BTreeMap<String, QuestionTaken>> {
        match self {
            Question::Boolean(question) => question.taken.as_ref(),
        }
    }
}

/// A single-statement question answered with TRUE or FALSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BooleanQuestion {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author: ObjectId,
    pub name: String,
    pub statement: String,
    #[serde(rename = "singleAnswer")]
    pub single_answer: BoolAnswer,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken: Option<BTreeMap<String, QuestionTaken>>,
}

/// The answer vocabulary for boolean questions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BoolAnswer {
    #[serde(rename = "TRUE")]
    True,
    #[serde(rename = "FALSE")]
    False,
}

/// A student's record on one question. `ca` is written exactly once, during
/// scoring; `uf` arrives later through the feedback pass and never touches
/// `ca`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionTaken {
    #[serde(rename = "ca")]
    pub correct_answer: u8,
    #[serde(rename = "uf", default, skip_serializing_if = "Option::is_none")]
    pub understood_feedback: Option<u8>,
}
