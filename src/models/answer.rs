use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;
use crate::models::question::BoolAnswer;

/// What a student sees while taking a test: the statement and its kind, never
/// the key or the feedback text.
#[derive(Debug, Serialize)]
pub struct QuestionPrompt {
    pub schema: String,
    pub statement: String,
}

/// One decoded answer-sheet entry. Wire names follow the submission format:
/// `ans` is the answer, `uq` the "understood the question" flag.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmittedAnswer {
    #[serde(rename = "ans")]
    pub answer: BoolAnswer,
    #[serde(rename = "uq")]
    pub understood: u8,
}

/// A fully validated answer submission: one entry per question index, in
/// question order. Decoding rejects the whole payload on any structural or
/// vocabulary mismatch — there is no partial scoring.
#[derive(Debug)]
pub struct AnswerSheet {
    entries: Vec<SubmittedAnswer>,
}

impl AnswerSheet {
    pub fn decode(input: &Value, question_count: usize) -> Result<Self, ServiceError> {
        let map = input
            .as_object()
            .ok_or_else(|| malformed("submission must be a JSON object keyed by question index"))?;
        if map.len() != question_count {
            return Err(malformed(format!(
                "submission must cover all {question_count} questions exactly once"
            )));
        }

        let mut entries = Vec::with_capacity(question_count);
        for index in 0..question_count {
            let entry = map
                .get(&index.to_string())
                .ok_or_else(|| malformed(format!("no entry for question {index}")))?;
            let answer: SubmittedAnswer = serde_json::from_value(entry.clone())
                .map_err(|err| malformed(format!("question {index}: {err}")))?;
            if answer.understood > 1 {
                return Err(malformed(format!(
                    "question {index}: understanding flag must be 0 or 1"
                )));
            }
            entries.push(answer);
        }
        Ok(Self { entries })
    }

    pub fn answers(&self) -> &[SubmittedAnswer] {
        &self.entries
    }
}

/// A validated post-test feedback submission: an understood-feedback flag
/// (0 or 1) for every question index.
#[derive(Debug)]
pub struct FeedbackSheet {
    flags: Vec<u8>,
}

impl FeedbackSheet {
    pub fn decode(input: &Value, question_count: usize) -> Result<Self, ServiceError> {
        let map = input
            .as_object()
            .ok_or_else(|| malformed("feedback must be a JSON object keyed by question index"))?;
        if map.len() != question_count {
            return Err(malformed(format!(
                "feedback must cover all {question_count} questions exactly once"
            )));
        }

        let mut flags = Vec::with_capacity(question_count);
        for index in 0..question_count {
            let value = map
                .get(&index.to_string())
                .ok_or_else(|| malformed(format!("no entry for question {index}")))?;
            let flag: u8 = serde_json::from_value(value.clone())
                .map_err(|err| malformed(format!("question {index}: {err}")))?;
            if flag > 1 {
                return Err(malformed(format!("question {index}: flag must be 0 or 1")));
            }
            flags.push(flag);
        }
        Ok(Self { flags })
    }

    pub fn flags(&self) -> &[u8] {
        &self.flags
    }
}

/// The scoring response: total score plus feedback text for exactly the
/// questions answered wrongly, keyed by question index.
#[derive(Debug, Serialize)]
pub struct ScoreReport {
    pub score: i64,
    pub feedback: BTreeMap<usize, String>,
}

fn malformed(detail: impl Into<String>) -> ServiceError {
    ServiceError::MalformedInput(detail.into())
}
