#![allow(dead_code)]

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde_json::{json, Value};

use examroom_engine::{AppState, Config};

/// Engine wired against the in-process store, with tracing capture for test
/// output.
pub fn create_test_app() -> AppState {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    AppState::in_memory(test_config())
}

pub fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://localhost:27017".to_string(),
        mongo_database: "examroom_test".to_string(),
    }
}

/// The seeded world the assessment suites run against: one author, four
/// students in distinct test states, three boolean questions and one test.
pub struct World {
    pub app: AppState,
    pub author: ObjectId,
    /// Registered on the test, not yet taken it.
    pub student_ready: ObjectId,
    /// Already has a score recorded on the test.
    pub student_taken: ObjectId,
    /// Never registered.
    pub student_outsider: ObjectId,
    /// Registered alongside `student_ready`; never submits in the fixtures.
    pub student_registered: ObjectId,
    /// Question ids in test order: correct answers FALSE, TRUE, FALSE.
    pub question_ids: Vec<ObjectId>,
    pub test_id: ObjectId,
}

pub async fn seed_world() -> World {
    let app = create_test_app();

    let author = create_user(&app, "testAuthor", "Test Author", "assessor").await;
    let student_ready = create_user(&app, "testStudent", "Test Student One", "student").await;
    let student_taken = create_user(&app, "testStudent2", "Test Student Two", "student").await;
    let student_outsider = create_user(&app, "testStudent3", "Test Student Three", "student").await;
    let student_registered = create_user(&app, "testStudent4", "Test Student Four", "student").await;

    let question_ids = vec![
        create_question(
            &app,
            author,
            "no vowels",
            "This sentence contains no vowels",
            "FALSE",
            "The sentence contains 2x 'i', 4x 'e', 3x 'o' and 1x 'a'",
        )
        .await,
        create_question(
            &app,
            author,
            "ten vowels",
            "This sentence contains 10 vowels",
            "TRUE",
            "Count the instances of 'a', 'e', 'i', 'o' and 'u'",
        )
        .await,
        create_question(
            &app,
            author,
            "jam sandwich",
            "This sentence contains a jam sandwich",
            "FALSE",
            "Clue: you cannot eat the question",
        )
        .await,
    ];

    let test_id = app
        .author
        .create_test(doc! {
            "schema": "standard",
            "author": author,
            "questions": question_ids.clone(),
        })
        .await
        .expect("test fixture should be accepted");

    app.author
        .make_test_available_to_user(test_id, student_ready)
        .await
        .expect("registering the ready student");
    app.author
        .make_test_available_to_user(test_id, student_registered)
        .await
        .expect("registering the second student");

    // Record a completed run for one student directly, the way an earlier
    // scoring pass would have left the document.
    let mut taken = Document::new();
    taken.insert(student_taken.to_hex(), 3_i64);
    app.store
        .update(
            "tests",
            Bson::Document(doc! { "_id": test_id }),
            Bson::Document(doc! { "taken": taken }),
        )
        .await
        .expect("seeding the taken entry");

    World {
        app,
        author,
        student_ready,
        student_taken,
        student_outsider,
        student_registered,
        question_ids,
        test_id,
    }
}

pub async fn create_user(
    app: &AppState,
    username: &str,
    full_name: &str,
    account_type: &str,
) -> ObjectId {
    app.store
        .create(
            "users",
            Bson::Document(doc! {
                "username": username,
                "password_hash": "$2y$10$fixture",
                "full_name": full_name,
                "account_type": account_type,
            }),
        )
        .await
        .expect("user fixture should be accepted")[0]
}

pub async fn create_question(
    app: &AppState,
    author: ObjectId,
    name: &str,
    statement: &str,
    answer: &str,
    feedback: &str,
) -> ObjectId {
    app.author
        .create_question(doc! {
            "schema": "boolean",
            "author": author,
            "name": name,
            "statement": statement,
            "singleAnswer": answer,
            "feedback": feedback,
        })
        .await
        .expect("question fixture should be accepted")
}

pub async fn create_group(app: &AppState, name: &str, members: &[ObjectId]) -> ObjectId {
    let members: Vec<String> = members.iter().map(|id| id.to_hex()).collect();
    app.store
        .create(
            "groups",
            Bson::Document(doc! { "name": name, "members": members }),
        )
        .await
        .expect("group fixture should be accepted")[0]
}

/// The standard submission against the seeded questions: wrong, wrong, right.
pub fn submitted_answers() -> Value {
    json!({
        "0": { "uq": 1, "ans": "TRUE" },
        "1": { "uq": 1, "ans": "FALSE" },
        "2": { "uq": 0, "ans": "FALSE" },
    })
}
