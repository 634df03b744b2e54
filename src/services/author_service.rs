use std::sync::Arc;

use indexmap::IndexMap;
use mongodb::bson::{doc, from_document, oid::ObjectId, Bson, Document};

use crate::error::ServiceError;
use crate::models::{
    EligibleRecipients, Group, Question, QuestionOverview, Test, TestDetails, User,
};
use crate::schema::{Requirement, SchemaRegistry, QUESTION_SCHEMAS, TEST_SCHEMAS};
use crate::store::{DocumentStore, Select, Target};

/// Authoring operations: schema-filtered create and update of questions and
/// tests, ownership-gated delete, the joined detail views, and registering
/// students (directly or by group) as eligible to take a test.
pub struct AuthorService {
    store: Arc<dyn DocumentStore>,
}

impl AuthorService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a question from untyped input. Every declared field is checked
    /// (required fields must be present, undeclared fields reject the whole
    /// call) and the result must decode as a known question variant before
    /// anything is persisted.
    pub async fn create_question(&self, input: Document) -> Result<ObjectId, ServiceError> {
        let document = filter_by_schema(&QUESTION_SCHEMAS, input)?;
        from_document::<Question>(document.clone())
            .map_err(|err| ServiceError::SchemaViolation(err.to_string()))?;

        let id = self.insert("questions", document).await?;
        tracing::info!(question = %id, "question created");
        Ok(id)
    }

    /// Create a test from untyped input; validation as for questions.
    pub async fn create_test(&self, input: Document) -> Result<ObjectId, ServiceError> {
        let document = filter_by_schema(&TEST_SCHEMAS, input)?;
        from_document::<Test>(document.clone())
            .map_err(|err| ServiceError::SchemaViolation(err.to_string()))?;

        let id = self.insert("tests", document).await?;
        tracing::info!(test = %id, "test created");
        Ok(id)
    }

    /// All questions authored by the given user, in creation order.
    pub async fn questions_by_author(
        &self,
        author_id: &str,
    ) -> Result<IndexMap<ObjectId, Question>, ServiceError> {
        let author = parse_id(author_id)?;
        let documents = self
            .store
            .read(
                "questions",
                Select::Where(Bson::Document(doc! { "author": author })),
            )
            .await?;
        documents
            .into_iter()
            .map(|(id, document)| Ok((id, from_document(document)?)))
            .collect()
    }

    /// All tests authored by the given user, in creation order.
    pub async fn tests_by_author(
        &self,
        author_id: &str,
    ) -> Result<IndexMap<ObjectId, Test>, ServiceError> {
        let author = parse_id(author_id)?;
        let documents = self
            .store
            .read(
                "tests",
                Select::Where(Bson::Document(doc! { "author": author })),
            )
            .await?;
        documents
            .into_iter()
            .map(|(id, document)| Ok((id, from_document(document)?)))
            .collect()
    }

    /// The single test matching both the id and the requesting author.
    pub async fn single_test(
        &self,
        test_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<Test, ServiceError> {
        let documents = self
            .store
            .read(
                "tests",
                Select::Where(Bson::Document(doc! { "_id": test_id, "author": requester_id })),
            )
            .await?;
        let (_, document) = documents.into_iter().next().ok_or(ServiceError::NotFound)?;
        Ok(from_document(document)?)
    }

    /// Apply a single-field update to a question. The field must be declared
    /// by the question's schema kind and must not be `author` or `schema`,
    /// which are immutable after creation.
    pub async fn update_question(
        &self,
        question_id: ObjectId,
        update: Document,
    ) -> Result<(), ServiceError> {
        let document = self.load("questions", question_id).await?;
        let kind = stored_kind(&document)?;
        let field = sole_update_key(&update)?;
        ensure_updatable(&QUESTION_SCHEMAS, &kind, field)?;

        self.store
            .update(
                "questions",
                Bson::Document(doc! { "_id": question_id }),
                Bson::Document(update),
            )
            .await?;
        Ok(())
    }

    /// Apply a single-field update to a test. Same rules as for questions;
    /// additionally, a `questions` update must supply a sequence.
    pub async fn update_test(&self, test_id: ObjectId, update: Document) -> Result<(), ServiceError> {
        let document = self.load("tests", test_id).await?;
        let kind = stored_kind(&document)?;
        let field = sole_update_key(&update)?;
        if field == "questions" && !matches!(update.get("questions"), Some(Bson::Array(_))) {
            return Err(ServiceError::SchemaViolation(
                "'questions' must be a sequence of question ids".into(),
            ));
        }
        ensure_updatable(&TEST_SCHEMAS, &kind, field)?;

        self.store
            .update(
                "tests",
                Bson::Document(doc! { "_id": test_id }),
                Bson::Document(update),
            )
            .await?;
        Ok(())
    }

    /// Delete a question if the requester authored it. A missing document and
    /// an ownership mismatch are indistinguishable to the caller, so probing
    /// ids reveals nothing.
    pub async fn delete_question(
        &self,
        question_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<(), ServiceError> {
        let question: Question = from_document(self.load_opaque("questions", question_id).await?)?;
        if question.author() != requester_id {
            return Err(ServiceError::Unauthorized);
        }

        self.store
            .delete(
                "questions",
                Target::Where(Bson::Document(doc! { "_id": question_id })),
            )
            .await?;
        tracing::info!(question = %question_id, "question deleted");
        Ok(())
    }

    /// Delete a test if the requester authored it.
    pub async fn delete_test(
        &self,
        test_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<(), ServiceError> {
        let test: Test = from_document(self.load_opaque("tests", test_id).await?)?;
        if test.author() != requester_id {
            return Err(ServiceError::Unauthorized);
        }

        self.store
            .delete(
                "tests",
                Target::Where(Bson::Document(doc! { "_id": test_id })),
            )
            .await?;
        tracing::info!(test = %test_id, "test deleted");
        Ok(())
    }

    /// The full authoring view of a test: question summaries in test order
    /// plus display names for the issued/taken sets. Every referenced
    /// document must resolve; a dangling reference fails the whole call.
    pub async fn full_test_details(
        &self,
        test_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<TestDetails, ServiceError> {
        let test: Test = from_document(self.load_opaque("tests", test_id).await?)?;
        if test.author() != requester_id {
            return Err(ServiceError::Unauthorized);
        }
        let Test::Standard(test) = test;

        let mut questions = IndexMap::new();
        for question_id in &test.questions {
            let question: Question = from_document(self.load("questions", *question_id).await?)?;
            questions.insert(
                question_id.to_hex(),
                QuestionOverview {
                    name: question.name().to_string(),
                    kind: capitalise(question.kind()),
                    statement: question.statement().to_string(),
                },
            );
        }

        let issued = match &test.available {
            None => None,
            Some(available) => {
                let mut issued = IndexMap::new();
                for student_id in available {
                    issued.insert(student_id.clone(), self.display_name(student_id).await?);
                }
                Some(issued)
            }
        };

        let taken = match &test.taken {
            None => None,
            Some(taken) => {
                let mut names = IndexMap::new();
                for student_id in taken.keys() {
                    names.insert(student_id.clone(), self.display_name(student_id).await?);
                }
                Some(names)
            }
        };

        Ok(TestDetails {
            questions,
            issued,
            taken,
        })
    }

    /// Students who can still be issued this test, and groups none of whose
    /// members has access yet. A group drops out as soon as any member is
    /// already registered or has taken the test.
    pub async fn students_for_test(
        &self,
        test_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<EligibleRecipients, ServiceError> {
        let test = match self.single_test(test_id, requester_id).await {
            Err(ServiceError::NotFound) => return Err(ServiceError::Unauthorized),
            other => other?,
        };

        let mut groups: IndexMap<String, Group> = self
            .store
            .read("groups", Select::All)
            .await?
            .into_iter()
            .map(|(id, document)| Ok((id.to_hex(), from_document(document)?)))
            .collect::<Result<_, ServiceError>>()?;

        let student_documents = self
            .store
            .read(
                "users",
                Select::Where(Bson::Document(doc! { "account_type": "student" })),
            )
            .await?;

        let mut students = IndexMap::new();
        for (id, document) in student_documents {
            let user: User = from_document(document)?;
            let student_id = id.to_hex();
            if test.grants_access_to(&student_id) {
                groups.retain(|_, group| !group.members.contains(&student_id));
            } else {
                students.insert(student_id, user.full_name);
            }
        }

        let groups = groups
            .into_iter()
            .map(|(id, group)| (id, group.name))
            .collect();
        Ok(EligibleRecipients { students, groups })
    }

    /// Register a single student as eligible to take a test. The test and the
    /// student must each resolve to exactly one document, and the student may
    /// not already be registered or have taken the test.
    pub async fn make_test_available_to_user(
        &self,
        test_id: ObjectId,
        student_id: ObjectId,
    ) -> Result<(), ServiceError> {
        let test = self.unique_test(test_id).await?;

        let users = self
            .store
            .read(
                "users",
                Select::Where(Bson::Document(doc! { "_id": student_id })),
            )
            .await?;
        if users.len() != 1 {
            return Err(ServiceError::NotFound);
        }

        self.register(test_id, &test, vec![student_id.to_hex()])
            .await
    }

    /// Register every member of a group. Each member must resolve to exactly
    /// one user document and none may already have access; any violation
    /// rejects the whole group.
    pub async fn make_test_available_to_group(
        &self,
        test_id: ObjectId,
        group_id: ObjectId,
    ) -> Result<(), ServiceError> {
        let test = self.unique_test(test_id).await?;

        let groups = self
            .store
            .read(
                "groups",
                Select::Where(Bson::Document(doc! { "_id": group_id })),
            )
            .await?;
        if groups.len() != 1 {
            return Err(ServiceError::NotFound);
        }
        let (_, document) = groups.into_iter().next().ok_or(ServiceError::NotFound)?;
        let group: Group = from_document(document)?;

        let mut additions = Vec::with_capacity(group.members.len());
        for member in &group.members {
            let member_id = ObjectId::parse_str(member).map_err(|_| ServiceError::NotFound)?;
            let users = self
                .store
                .read(
                    "users",
                    Select::Where(Bson::Document(doc! { "_id": member_id })),
                )
                .await?;
            if users.len() != 1 {
                return Err(ServiceError::NotFound);
            }
            additions.push(member.clone());
        }

        self.register(test_id, &test, additions).await
    }

    async fn register(
        &self,
        test_id: ObjectId,
        test: &Test,
        additions: Vec<String>,
    ) -> Result<(), ServiceError> {
        for student_id in &additions {
            if test.grants_access_to(student_id) {
                return Err(ServiceError::NotEligible);
            }
        }

        let mut available = test.available().to_vec();
        available.extend(additions.iter().cloned());
        self.store
            .update(
                "tests",
                Bson::Document(doc! { "_id": test_id }),
                Bson::Document(doc! { "available": available }),
            )
            .await?;
        tracing::info!(test = %test_id, students = additions.len(), "test made available");
        Ok(())
    }

    async fn unique_test(&self, test_id: ObjectId) -> Result<Test, ServiceError> {
        let tests = self
            .store
            .read(
                "tests",
                Select::Where(Bson::Document(doc! { "_id": test_id })),
            )
            .await?;
        if tests.len() != 1 {
            return Err(ServiceError::NotFound);
        }
        let (_, document) = tests.into_iter().next().ok_or(ServiceError::NotFound)?;
        Ok(from_document(document)?)
    }

    async fn load(&self, collection: &str, id: ObjectId) -> Result<Document, ServiceError> {
        let documents = self
            .store
            .read(collection, Select::Where(Bson::Document(doc! { "_id": id })))
            .await?;
        documents
            .into_iter()
            .next()
            .map(|(_, document)| document)
            .ok_or(ServiceError::NotFound)
    }

    /// As [`Self::load`], but a miss surfaces as `Unauthorized` so
    /// ownership-gated paths never reveal whether an id exists.
    async fn load_opaque(&self, collection: &str, id: ObjectId) -> Result<Document, ServiceError> {
        match self.load(collection, id).await {
            Err(ServiceError::NotFound) => Err(ServiceError::Unauthorized),
            other => other,
        }
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<ObjectId, ServiceError> {
        let ids = self
            .store
            .create(collection, Bson::Document(document))
            .await?;
        ids.into_iter().next().ok_or(ServiceError::NotFound)
    }

    async fn display_name(&self, user_id: &str) -> Result<String, ServiceError> {
        let id = ObjectId::parse_str(user_id).map_err(|_| ServiceError::NotFound)?;
        let user: User = from_document(self.load("users", id).await?)?;
        Ok(user.full_name)
    }
}

/// Move every declared field from `input` into a fresh document. Missing
/// required fields, undeclared leftovers and unregistered kinds all reject
/// the call — nothing is silently dropped and nothing partial is inserted.
fn filter_by_schema(registry: &SchemaRegistry, mut input: Document) -> Result<Document, ServiceError> {
    let kind = input
        .get_str("schema")
        .map_err(|_| ServiceError::SchemaViolation("input declares no schema kind".into()))?
        .to_string();
    let fields = registry
        .fields(&kind)
        .ok_or_else(|| ServiceError::SchemaViolation(format!("'{kind}' is not a registered schema")))?;

    let mut document = Document::new();
    for (field, requirement) in fields {
        match input.remove(*field) {
            Some(value) => {
                document.insert(*field, value);
            }
            None if *requirement == Requirement::Required => {
                return Err(ServiceError::SchemaViolation(format!(
                    "required field '{field}' is missing"
                )));
            }
            None => {}
        }
    }

    if !input.is_empty() {
        let undeclared: Vec<&str> = input.keys().map(String::as_str).collect();
        return Err(ServiceError::SchemaViolation(format!(
            "fields not declared by '{kind}': {}",
            undeclared.join(", ")
        )));
    }
    Ok(document)
}

fn sole_update_key(update: &Document) -> Result<&str, ServiceError> {
    let mut keys = update.keys();
    match (keys.next(), keys.next()) {
        (Some(key), None) => Ok(key),
        _ => Err(ServiceError::SchemaViolation(
            "an update must touch exactly one field".into(),
        )),
    }
}

fn ensure_updatable(
    registry: &SchemaRegistry,
    kind: &str,
    field: &str,
) -> Result<(), ServiceError> {
    if field == "author" || field == "schema" {
        return Err(ServiceError::SchemaViolation(format!(
            "'{field}' is immutable after creation"
        )));
    }
    if !registry.declares(kind, field) {
        return Err(ServiceError::SchemaViolation(format!(
            "'{field}' is not declared by '{kind}'"
        )));
    }
    Ok(())
}

fn stored_kind(document: &Document) -> Result<String, ServiceError> {
    document
        .get_str("schema")
        .map(str::to_string)
        .map_err(|_| ServiceError::SchemaViolation("stored document has no schema kind".into()))
}

fn capitalise(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn parse_id(id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(id)
        .map_err(|_| ServiceError::MalformedInput(format!("'{id}' is not a valid id")))
}
