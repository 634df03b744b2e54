use std::collections::BTreeMap;
use std::sync::Arc;

use mongodb::bson::{doc, from_document, oid::ObjectId, to_bson, Bson};
use serde_json::Value;

use crate::error::ServiceError;
use crate::models::{
    AnswerSheet, FeedbackSheet, Question, QuestionPrompt, QuestionTaken, ScoreReport, Test,
};
use crate::store::{DocumentStore, Select};

/// Shown by the presentation layer when [`AssessService::list_available_tests`]
/// comes back empty.
pub const NO_TESTS_MESSAGE: &str =
    "There are no tests available for you to take right now. Please try again later.";

/// The test-taking side of the engine. Per (test, student) pair the state
/// machine is `Unregistered -> Available -> Taken`, forward only; the
/// `Available -> Taken` transition happens exactly once, inside
/// [`Self::update_answers`].
pub struct AssessService {
    store: Arc<dyn DocumentStore>,
}

impl AssessService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Ids of every test the student is registered for and has not yet taken.
    /// An id that is not well-formed hexadecimal yields the empty list — an
    /// unauthenticated probe learns nothing it would not learn from a student
    /// with no tests.
    pub async fn list_available_tests(&self, student_id: &str) -> Result<Vec<String>, ServiceError> {
        if ObjectId::parse_str(student_id).is_err() {
            return Ok(Vec::new());
        }

        let documents = self.store.read("tests", Select::All).await?;
        let mut available = Vec::new();
        for (id, document) in documents {
            let test: Test = from_document(document)?;
            if test.is_available_to(student_id) {
                available.push(id.to_hex());
            }
        }
        Ok(available)
    }

    /// Whether the student may currently submit answers for this test.
    pub async fn check_test_available(
        &self,
        test_id: ObjectId,
        student_id: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .find_test(test_id)
            .await?
            .is_some_and(|test| test.is_available_to(student_id)))
    }

    /// Whether the student has already taken this test.
    pub async fn check_test_taken(
        &self,
        test_id: ObjectId,
        student_id: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .find_test(test_id)
            .await?
            .is_some_and(|test| test.is_taken_by(student_id)))
    }

    /// The questions of a test as the student sees them, keyed by position:
    /// schema kind and statement only, never the answer key or feedback text.
    pub async fn question_prompts(
        &self,
        test_id: ObjectId,
    ) -> Result<BTreeMap<usize, QuestionPrompt>, ServiceError> {
        let test = self.require_test(test_id).await?;

        let mut prompts = BTreeMap::new();
        for (index, question_id) in test.questions().iter().enumerate() {
            let question = self.load_question(*question_id).await?;
            prompts.insert(
                index,
                QuestionPrompt {
                    schema: question.kind().to_string(),
                    statement: question.statement().to_string(),
                },
            );
        }
        Ok(prompts)
    }

    /// Score a student's submission.
    ///
    /// The student must be in the `Available` state, and the submission must
    /// decode to exactly one entry per question; only then does any write
    /// happen. Each question document records `{ ca }` for the student, and
    /// the final write puts the total score into the test's `taken` map —
    /// completing the `Available -> Taken` transition and making a repeat
    /// call ineligible.
    ///
    /// The per-entry `uq` flag is validated with the rest of the submission
    /// but carries no scoring effect and is not persisted.
    pub async fn update_answers(
        &self,
        test_id: ObjectId,
        student_id: &str,
        input: &Value,
    ) -> Result<ScoreReport, ServiceError> {
        let test = self.require_test(test_id).await?;
        if !test.is_available_to(student_id) {
            return Err(ServiceError::NotEligible);
        }

        let Test::Standard(test) = test;
        let sheet = AnswerSheet::decode(input, test.questions.len())?;

        // Resolve every question up front so a dangling reference rejects the
        // submission before the first write.
        let mut questions = Vec::with_capacity(test.questions.len());
        for question_id in &test.questions {
            questions.push(self.load_question(*question_id).await?);
        }

        let mut score: i64 = 0;
        let mut feedback = BTreeMap::new();
        for (index, (question_id, question)) in test.questions.iter().zip(&questions).enumerate() {
            let Question::Boolean(question) = question;
            let correct = u8::from(sheet.answers()[index].answer == question.single_answer);
            score += i64::from(correct);
            if correct == 0 {
                feedback.insert(index, question.feedback.clone());
            }

            let mut taken = question.taken.clone().unwrap_or_default();
            taken.insert(
                student_id.to_string(),
                QuestionTaken {
                    correct_answer: correct,
                    understood_feedback: None,
                },
            );
            let taken = to_bson(&taken)?;
            self.store
                .update(
                    "questions",
                    Bson::Document(doc! { "_id": *question_id }),
                    Bson::Document(doc! { "taken": taken }),
                )
                .await?;
        }

        // The score write is last: it is the state transition, and it also
        // retires the student's `available` membership.
        let mut taken = test.taken.clone().unwrap_or_default();
        taken.insert(student_id.to_string(), score);
        let taken = to_bson(&taken)?;
        let available: Vec<String> = test
            .available
            .unwrap_or_default()
            .into_iter()
            .filter(|id| id != student_id)
            .collect();
        self.store
            .update(
                "tests",
                Bson::Document(doc! { "_id": test_id }),
                Bson::Document(doc! { "taken": taken, "available": available }),
            )
            .await?;

        tracing::info!(test = %test_id, student = %student_id, score, "answers scored");
        Ok(ScoreReport { score, feedback })
    }

    /// Record, per question, whether the student understood the feedback they
    /// received. Only a student in the `Taken` state may submit, and the
    /// previously recorded `ca` values are never touched.
    pub async fn update_feedback(
        &self,
        test_id: ObjectId,
        student_id: &str,
        input: &Value,
    ) -> Result<(), ServiceError> {
        let test = self.require_test(test_id).await?;
        if !test.is_taken_by(student_id) {
            return Err(ServiceError::NotEligible);
        }

        let Test::Standard(test) = test;
        let sheet = FeedbackSheet::decode(input, test.questions.len())?;

        // Every question must already hold a scoring record for this student;
        // verify before the first write so a failure mutates nothing.
        let mut questions = Vec::with_capacity(test.questions.len());
        for question_id in &test.questions {
            let question = self.load_question(*question_id).await?;
            let Question::Boolean(boolean) = &question;
            if !boolean
                .taken
                .as_ref()
                .is_some_and(|taken| taken.contains_key(student_id))
            {
                return Err(ServiceError::NotFound);
            }
            questions.push(question);
        }

        for ((question_id, question), flag) in test
            .questions
            .iter()
            .zip(questions)
            .zip(sheet.flags().iter().copied())
        {
            let Question::Boolean(question) = question;
            let mut taken = question.taken.unwrap_or_default();
            if let Some(record) = taken.get_mut(student_id) {
                record.understood_feedback = Some(flag);
            }
            let taken = to_bson(&taken)?;
            self.store
                .update(
                    "questions",
                    Bson::Document(doc! { "_id": *question_id }),
                    Bson::Document(doc! { "taken": taken }),
                )
                .await?;
        }

        tracing::info!(test = %test_id, student = %student_id, "feedback recorded");
        Ok(())
    }

    async fn find_test(&self, test_id: ObjectId) -> Result<Option<Test>, ServiceError> {
        let documents = self
            .store
            .read(
                "tests",
                Select::Where(Bson::Document(doc! { "_id": test_id })),
            )
            .await?;
        match documents.into_iter().next() {
            Some((_, document)) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn require_test(&self, test_id: ObjectId) -> Result<Test, ServiceError> {
        self.find_test(test_id).await?.ok_or(ServiceError::NotFound)
    }

    async fn load_question(&self, question_id: ObjectId) -> Result<Question, ServiceError> {
        let documents = self
            .store
            .read(
                "questions",
                Select::Where(Bson::Document(doc! { "_id": question_id })),
            )
            .await?;
        let (_, document) = documents.into_iter().next().ok_or(ServiceError::NotFound)?;
        Ok(from_document(document)?)
    }
}
