mod common;

use mongodb::bson::{doc, from_document, oid::ObjectId, Bson};
use serde_json::json;
use examroom_engine::models::Question;
use examroom_engine::{Select, ServiceError, NO_TESTS_MESSAGE};

async fn question_record(
    world: &common::World,
    question_id: ObjectId,
    student: ObjectId,
) -> Option<examroom_engine::models::QuestionTaken> {
    let documents = world
        .app
        .store
        .read(
            "questions",
            Select::Where(Bson::Document(doc! { "_id": question_id })),
        )
        .await
        .unwrap();
    let (_, document) = documents.into_iter().next().unwrap();
    let question: Question = from_document(document).unwrap();
    question
        .taken()
        .and_then(|taken| taken.get(&student.to_hex()))
        .copied()
}

async fn test_score(world: &common::World, student: ObjectId) -> Option<i64> {
    let documents = world
        .app
        .store
        .read(
            "tests",
            Select::Where(Bson::Document(doc! { "_id": world.test_id })),
        )
        .await
        .unwrap();
    let (_, document) = documents.into_iter().next().unwrap();
    document
        .get_document("taken")
        .ok()
        .and_then(|taken| taken.get(&student.to_hex()).cloned())
        .and_then(|value| value.as_i64().or_else(|| value.as_i32().map(i64::from)))
}

#[tokio::test]
async fn registered_students_see_their_available_tests() {
    let world = common::seed_world().await;
    let available = world
        .app
        .assess
        .list_available_tests(&world.student_ready.to_hex())
        .await
        .unwrap();
    assert_eq!(available, vec![world.test_id.to_hex()]);
}

#[tokio::test]
async fn students_without_tests_get_an_empty_list() {
    let world = common::seed_world().await;
    let available = world
        .app
        .assess
        .list_available_tests(&world.student_taken.to_hex())
        .await
        .unwrap();
    assert!(available.is_empty());
    // the user-facing message the presentation layer shows for this case
    assert!(NO_TESTS_MESSAGE.contains("no tests available"));
}

#[tokio::test]
async fn malformed_student_ids_look_like_no_results() {
    let world = common::seed_world().await;
    let available = world
        .app
        .assess
        .list_available_tests("<script>alert('hi');</script>")
        .await
        .unwrap();
    assert!(available.is_empty());
}

#[tokio::test]
async fn availability_and_taken_predicates_track_state() {
    let world = common::seed_world().await;
    let assess = &world.app.assess;

    assert!(assess
        .check_test_available(world.test_id, &world.student_ready.to_hex())
        .await
        .unwrap());
    assert!(!assess
        .check_test_available(world.test_id, &world.student_outsider.to_hex())
        .await
        .unwrap());
    assert!(!assess
        .check_test_available(world.test_id, &world.student_taken.to_hex())
        .await
        .unwrap());

    assert!(assess
        .check_test_taken(world.test_id, &world.student_taken.to_hex())
        .await
        .unwrap());
    assert!(!assess
        .check_test_taken(world.test_id, &world.student_ready.to_hex())
        .await
        .unwrap());
}

#[tokio::test]
async fn question_prompts_exclude_answers_and_feedback() {
    let world = common::seed_world().await;
    let prompts = world
        .app
        .assess
        .question_prompts(world.test_id)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&prompts).unwrap(),
        "{\"0\":{\"schema\":\"boolean\",\"statement\":\"This sentence contains no vowels\"},\
         \"1\":{\"schema\":\"boolean\",\"statement\":\"This sentence contains 10 vowels\"},\
         \"2\":{\"schema\":\"boolean\",\"statement\":\"This sentence contains a jam sandwich\"}}"
    );
}

#[tokio::test]
async fn question_prompts_fail_for_unknown_tests() {
    let world = common::seed_world().await;
    let err = world
        .app
        .assess
        .question_prompts(ObjectId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound));
}

#[tokio::test]
async fn scoring_counts_matches_and_reports_feedback_for_misses() {
    let world = common::seed_world().await;
    let student = world.student_ready;

    let report = world
        .app
        .assess
        .update_answers(world.test_id, &student.to_hex(), &common::submitted_answers())
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&report).unwrap(),
        "{\"score\":1,\"feedback\":\
         {\"0\":\"The sentence contains 2x 'i', 4x 'e', 3x 'o' and 1x 'a'\",\
         \"1\":\"Count the instances of 'a', 'e', 'i', 'o' and 'u'\"}}"
    );

    // the wrong answer on question 0 is recorded against the question
    let record = question_record(&world, world.question_ids[0], student)
        .await
        .unwrap();
    assert_eq!(record.correct_answer, 0);
    assert_eq!(record.understood_feedback, None);
    let record = question_record(&world, world.question_ids[2], student)
        .await
        .unwrap();
    assert_eq!(record.correct_answer, 1);

    // the total lands on the test document and the state flips to Taken
    assert_eq!(test_score(&world, student).await, Some(1));
    assert!(world
        .app
        .assess
        .check_test_taken(world.test_id, &student.to_hex())
        .await
        .unwrap());
    assert!(world
        .app
        .assess
        .list_available_tests(&student.to_hex())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn scoring_happens_at_most_once_per_student() {
    let world = common::seed_world().await;
    let student = world.student_ready;

    world
        .app
        .assess
        .update_answers(world.test_id, &student.to_hex(), &common::submitted_answers())
        .await
        .unwrap();

    // a second run changes nothing, even with different answers
    let retry = json!({
        "0": { "uq": 1, "ans": "FALSE" },
        "1": { "uq": 1, "ans": "TRUE" },
        "2": { "uq": 1, "ans": "FALSE" },
    });
    let err = world
        .app
        .assess
        .update_answers(world.test_id, &student.to_hex(), &retry)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotEligible));
    assert_eq!(test_score(&world, student).await, Some(1));
}

#[tokio::test]
async fn ineligible_students_cannot_submit() {
    let world = common::seed_world().await;

    for student in [world.student_taken, world.student_outsider] {
        let err = world
            .app
            .assess
            .update_answers(world.test_id, &student.to_hex(), &common::submitted_answers())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotEligible));
        assert_eq!(
            question_record(&world, world.question_ids[0], student).await,
            None
        );
    }
}

#[tokio::test]
async fn undecodable_submissions_are_rejected_without_scoring() {
    let world = common::seed_world().await;
    let student = world.student_registered;

    let err = world
        .app
        .assess
        .update_answers(
            world.test_id,
            &student.to_hex(),
            &json!("Invalid JSON: Syntax error"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::MalformedInput(_)));

    // still registered, nothing written
    assert!(world
        .app
        .assess
        .check_test_available(world.test_id, &student.to_hex())
        .await
        .unwrap());
    assert_eq!(
        question_record(&world, world.question_ids[0], student).await,
        None
    );
}

#[tokio::test]
async fn partial_submissions_are_rejected() {
    let world = common::seed_world().await;
    let student = world.student_registered.to_hex();

    let missing_question = json!({
        "0": { "uq": 1, "ans": "TRUE" },
        "2": { "uq": 0, "ans": "FALSE" },
    });
    let missing_answer = json!({
        "0": { "uq": 1 },
        "1": { "uq": 1, "ans": "FALSE" },
        "2": { "uq": 0, "ans": "FALSE" },
    });
    let missing_flag = json!({
        "0": { "uq": 1, "ans": "TRUE" },
        "1": { "uq": 1, "ans": "FALSE" },
        "2": { "ans": "FALSE" },
    });

    for input in [missing_question, missing_answer, missing_flag] {
        let err = world
            .app
            .assess
            .update_answers(world.test_id, &student, &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MalformedInput(_)));
    }
}

#[tokio::test]
async fn out_of_vocabulary_submissions_are_rejected() {
    let world = common::seed_world().await;
    let student = world.student_registered.to_hex();

    let bad_answer = json!({
        "0": { "uq": 1, "ans": "goats" },
        "1": { "uq": 1, "ans": "FALSE" },
        "2": { "uq": 0, "ans": "FALSE" },
    });
    let bad_flag = json!({
        "0": { "uq": 1, "ans": "TRUE" },
        "1": { "uq": 2, "ans": "FALSE" },
        "2": { "uq": 0, "ans": "FALSE" },
    });

    for input in [bad_answer, bad_flag] {
        let err = world
            .app
            .assess
            .update_answers(world.test_id, &student, &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MalformedInput(_)));
    }
}

#[tokio::test]
async fn feedback_is_recorded_without_touching_scores() {
    let world = common::seed_world().await;
    let student = world.student_ready;

    world
        .app
        .assess
        .update_answers(world.test_id, &student.to_hex(), &common::submitted_answers())
        .await
        .unwrap();

    world
        .app
        .assess
        .update_feedback(
            world.test_id,
            &student.to_hex(),
            &json!({ "0": 1, "1": 0, "2": 1 }),
        )
        .await
        .unwrap();

    let record = question_record(&world, world.question_ids[0], student)
        .await
        .unwrap();
    assert_eq!(record.correct_answer, 0);
    assert_eq!(record.understood_feedback, Some(1));

    let record = question_record(&world, world.question_ids[1], student)
        .await
        .unwrap();
    assert_eq!(record.understood_feedback, Some(0));
}

#[tokio::test]
async fn feedback_requires_the_taken_state() {
    let world = common::seed_world().await;

    for student in [world.student_ready, world.student_outsider] {
        let err = world
            .app
            .assess
            .update_feedback(
                world.test_id,
                &student.to_hex(),
                &json!({ "0": 1, "1": 0, "2": 1 }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotEligible));
    }
}

#[tokio::test]
async fn malformed_feedback_is_rejected() {
    let world = common::seed_world().await;
    let student = world.student_ready;

    world
        .app
        .assess
        .update_answers(world.test_id, &student.to_hex(), &common::submitted_answers())
        .await
        .unwrap();

    for input in [
        json!("Invalid JSON: Syntax error"),
        json!({ "0": 1, "1": -4, "2": 1 }),
        json!({ "0": 1, "1": 0 }),
    ] {
        let err = world
            .app
            .assess
            .update_feedback(world.test_id, &student.to_hex(), &input)
            .await
            .unwrap_err();
        // never NotEligible here: the student has taken the test
        assert!(matches!(err, ServiceError::MalformedInput(_)));
    }
}
