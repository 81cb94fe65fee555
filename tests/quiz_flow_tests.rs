mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use classroom_server::{
    errors::AppError,
    models::{
        domain::{QuizAnswer, QuizQuestion},
        dto::request::{CreateQuizInput, QuizQuestionInput},
    },
    repositories::QuizRepository,
    services::{
        attempt_session::SessionState, quiz_attempt_service::RejectionReason,
        quiz_randomizer::prepare_quiz_for_presentation,
    },
};

use common::*;

fn correct_answers() -> Vec<QuizAnswer> {
    vec![
        QuizAnswer::choice(1),
        QuizAnswer::choice(0),
        QuizAnswer::text("tokyo"),
        QuizAnswer::text("3"),
    ]
}

/// Right answers for the quiz in the order the student is shown it.
fn answers_for_presented(quiz: &classroom_server::models::domain::Quiz) -> Vec<QuizAnswer> {
    prepare_quiz_for_presentation(quiz, &quiz.id)
        .questions
        .iter()
        .map(|question: &QuizQuestion| match question.correct_option {
            Some(index) => QuizAnswer::choice(index),
            None => match (&question.correct_answer_text, question.correct_number) {
                (Some(text), _) => QuizAnswer::text(text),
                (None, Some(number)) => QuizAnswer::text(&number.to_string()),
                (None, None) => QuizAnswer::default(),
            },
        })
        .collect()
}

#[tokio::test]
async fn first_attempt_earns_xp_and_retakes_do_not() {
    let world = TestWorld::new().await;
    let quiz = world.add_quiz(capitals_quiz()).await;
    let service = &world.state.quiz_service;

    let first = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("first attempt");
    assert!(first.result.accepted);
    assert_eq!(first.result.score, 4);
    assert_eq!(first.result.attempt_number, Some(1));
    assert_eq!(first.result.xp_awarded, 20);

    let second = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("retake");
    assert!(second.result.accepted);
    assert_eq!(second.result.attempt_number, Some(2));
    assert_eq!(second.result.xp_awarded, 0);

    assert_eq!(world.xp_of(ANA).await, 20);
    let history = service
        .my_attempts(&caller(ANA), &quiz.id)
        .await
        .expect("history");
    let numbers: Vec<u32> = history.iter().map(|a| a.attempt_number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn single_attempt_quiz_turns_away_the_retake() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.single_attempt = true;
    let quiz = world.add_quiz(quiz).await;
    let service = &world.state.quiz_service;

    service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, vec![])
        .await
        .expect("first attempt");
    let retake = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("rejections are results, not errors");

    assert!(!retake.result.accepted);
    assert_eq!(retake.result.reason, Some(RejectionReason::SingleAttemptExceeded));
    assert_eq!(world.attempt_count().await, 1);
    assert_eq!(world.xp_of(ANA).await, 0);
}

#[tokio::test]
async fn closed_quiz_records_nothing() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.due_date = Some(Utc::now() - Duration::hours(1));
    let quiz = world.add_quiz(quiz).await;

    let result = world
        .state
        .quiz_service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("submit");

    assert_eq!(result.result.reason, Some(RejectionReason::QuizClosed));
    assert_eq!(world.attempt_count().await, 0);
}

#[tokio::test]
async fn a_lost_race_for_the_attempt_number_is_retried_once() {
    let world = TestWorld::new().await;
    let quiz = world.add_quiz(capitals_quiz()).await;
    world.attempts.race_next_writes(1);

    let graded = world
        .state
        .quiz_service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("retry succeeds");

    assert_eq!(graded.result.attempt_number, Some(2));
    assert_eq!(graded.result.xp_awarded, 0);
    assert_eq!(world.attempt_count().await, 2);
    // only the winning first attempt credited XP
    assert_eq!(world.xp_of(ANA).await, 20);
}

#[tokio::test]
async fn a_second_lost_race_surfaces_as_conflict() {
    let world = TestWorld::new().await;
    let quiz = world.add_quiz(capitals_quiz()).await;
    world.attempts.race_next_writes(2);

    let result = world
        .state
        .quiz_service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn randomized_quiz_is_graded_in_presented_order() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.randomize_questions = true;
    quiz.randomize_options = true;
    quiz.show_explanations = true;
    let quiz = world.add_quiz(quiz).await;
    let service = &world.state.quiz_service;

    let presented = service
        .quiz_for_taking(&caller(BEN), &quiz.id)
        .await
        .expect("presented quiz");
    let again = service
        .quiz_for_taking(&caller(ANA), &quiz.id)
        .await
        .expect("presented quiz");
    let prompts = |q: &classroom_server::models::domain::Quiz| -> Vec<String> {
        q.questions.iter().map(|question| question.prompt.clone()).collect()
    };
    assert_eq!(prompts(&presented.quiz), prompts(&again.quiz));
    assert_eq!(presented.advertised_xp, 20);

    let graded = service
        .submit_quiz_attempt(&caller(BEN), &quiz.id, answers_for_presented(&quiz))
        .await
        .expect("submit");

    assert_eq!(graded.result.score, 4);
    assert_eq!(graded.explanations.len(), 4);
    let paris = presented
        .quiz
        .questions
        .iter()
        .position(|q| q.prompt == "Capital of France")
        .expect("question present");
    assert_eq!(
        graded.explanations[paris].as_deref(),
        Some("Paris has been the capital since 987")
    );
}

#[tokio::test]
async fn outsiders_cannot_see_or_submit() {
    let world = TestWorld::new().await;
    let quiz = world.add_quiz(capitals_quiz()).await;
    let service = &world.state.quiz_service;

    let view = service.quiz_for_taking(&caller(OUTSIDER), &quiz.id).await;
    let submit = service
        .submit_quiz_attempt(&caller(OUTSIDER), &quiz.id, correct_answers())
        .await;

    assert!(matches!(view, Err(AppError::Forbidden(_))));
    assert!(matches!(submit, Err(AppError::Forbidden(_))));
    assert!(matches!(
        service.quiz_for_taking(&caller(ANA), "missing").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn only_the_class_teacher_creates_validated_quizzes() {
    let world = TestWorld::new().await;
    let service = &world.state.quiz_service;
    let input = CreateQuizInput {
        class_id: CLASS_ID.to_string(),
        title: "Cells".to_string(),
        questions: vec![QuizQuestionInput {
            prompt: "Powerhouse of the cell".to_string(),
            question_type: None,
            options: vec!["Nucleus".to_string(), "Mitochondria".to_string()],
            correct_option: Some(1),
            correct_answer_text: None,
            correct_number: None,
            explanation: None,
        }],
        randomize_questions: false,
        randomize_options: true,
        single_attempt: false,
        max_attempts: None,
        due_date: None,
        xp_value: None,
        xp_per_question: None,
        show_explanations: false,
        time_limit_secs: None,
    };

    let denied = service.create_quiz(&caller(ANA), input.clone()).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let mut broken = input.clone();
    broken.questions[0].correct_option = Some(5);
    let invalid = service.create_quiz(&caller(TEACHER), broken).await;
    assert!(matches!(invalid, Err(AppError::ValidationError(_))));

    let quiz = service
        .create_quiz(&caller(TEACHER), input)
        .await
        .expect("teacher creates quiz");
    assert_eq!(quiz.created_by_user_id, TEACHER);
    assert!(world.quizzes.find_by_id(&quiz.id).await.expect("lookup").is_some());
}

#[tokio::test]
async fn timer_auto_submits_saved_answers_at_the_deadline() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.time_limit_secs = Some(1);
    let quiz = world.add_quiz(quiz).await;
    let service = &world.state.quiz_service;

    let status = service
        .start_timer(&caller(ANA), &quiz.id)
        .await
        .expect("timer starts");
    assert_eq!(status.state, SessionState::InProgress);
    assert!(status.deadline.is_some());

    service
        .save_answer(&caller(ANA), &quiz.id, 0, QuizAnswer::choice(1))
        .await
        .expect("save answer");
    service
        .save_answer(&caller(ANA), &quiz.id, 2, QuizAnswer::text("Tokyo"))
        .await
        .expect("save answer");

    tokio::time::sleep(StdDuration::from_millis(1500)).await;

    let attempts = service.my_attempts(&caller(ANA), &quiz.id).await.expect("history");
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].auto_submitted);
    assert_eq!(attempts[0].score, 2);
    assert_eq!(world.xp_of(ANA).await, 10);

    let late = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("late submit");
    assert_eq!(late.result.reason, Some(RejectionReason::DuplicateSubmission));
    assert_eq!(world.attempt_count().await, 1);
}

#[tokio::test]
async fn manual_submit_beats_the_pending_auto_submit() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.time_limit_secs = Some(600);
    let quiz = world.add_quiz(quiz).await;
    let service = &world.state.quiz_service;

    service.start_timer(&caller(ANA), &quiz.id).await.expect("timer");
    let manual = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("manual submit");
    assert!(manual.result.accepted);
    assert!(!manual.auto_submitted);

    let auto = service.auto_submit(&quiz.id, ANA).await.expect("auto submit");
    assert!(auto.is_none());
    assert_eq!(world.attempt_count().await, 1);
}

#[tokio::test]
async fn failed_auto_submit_keeps_answers_for_another_try() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.time_limit_secs = Some(600);
    let quiz = world.add_quiz(quiz).await;
    let service = &world.state.quiz_service;

    service.start_timer(&caller(ANA), &quiz.id).await.expect("timer");
    service
        .save_answer(&caller(ANA), &quiz.id, 3, QuizAnswer::text("3"))
        .await
        .expect("save");
    world.attempts.fail_next_writes(1);

    let failed = service.auto_submit(&quiz.id, ANA).await;
    match failed {
        Err(AppError::AutoSubmitFailed(message)) => {
            assert_eq!(message, "could not auto-submit, try again")
        }
        other => panic!("expected auto-submit failure, got {:?}", other.map(|_| ())),
    }

    let status = service.start_timer(&caller(ANA), &quiz.id).await.expect("status");
    assert_eq!(status.state, SessionState::InProgress);

    let retried = service
        .auto_submit(&quiz.id, ANA)
        .await
        .expect("second try")
        .expect("recorded");
    assert_eq!(retried.result.score, 1);
    assert!(retried.auto_submitted);
}

#[tokio::test]
async fn failed_timer_auto_submit_is_reported_and_can_be_retried() {
    let world = TestWorld::new().await;
    let mut quiz = capitals_quiz();
    quiz.time_limit_secs = Some(1);
    let quiz = world.add_quiz(quiz).await;
    let service = &world.state.quiz_service;

    service.start_timer(&caller(ANA), &quiz.id).await.expect("timer");
    service
        .save_answer(&caller(ANA), &quiz.id, 0, QuizAnswer::choice(1))
        .await
        .expect("save");
    service
        .save_answer(&caller(ANA), &quiz.id, 3, QuizAnswer::text("3"))
        .await
        .expect("save");
    world.attempts.fail_next_writes(1);

    let early = service.retry_auto_submit(&caller(ANA), &quiz.id).await;
    assert!(matches!(early, Err(AppError::BadRequest(_))));

    tokio::time::sleep(StdDuration::from_millis(1500)).await;
    assert_eq!(world.attempt_count().await, 0);

    let status = service
        .timer_status(&caller(ANA), &quiz.id)
        .await
        .expect("status")
        .expect("session is still open");
    assert_eq!(status.state, SessionState::InProgress);
    assert_eq!(status.remaining, Some(Duration::zero()));
    assert_eq!(
        status.auto_submit_error.as_deref(),
        Some("could not auto-submit, try again")
    );

    let late_edit = service
        .save_answer(&caller(ANA), &quiz.id, 2, QuizAnswer::text("Tokyo"))
        .await;
    assert!(matches!(late_edit, Err(AppError::BadRequest(_))));

    let retried = service
        .retry_auto_submit(&caller(ANA), &quiz.id)
        .await
        .expect("retry");
    assert!(retried.result.accepted);
    assert!(retried.auto_submitted);
    assert_eq!(retried.result.score, 2);
    assert_eq!(world.xp_of(ANA).await, 10);

    let status = service
        .timer_status(&caller(ANA), &quiz.id)
        .await
        .expect("status")
        .expect("session kept");
    assert_eq!(status.state, SessionState::Completed);
    assert_eq!(status.auto_submit_error, None);

    let again = service
        .retry_auto_submit(&caller(ANA), &quiz.id)
        .await
        .expect("second retry");
    assert_eq!(again.result.reason, Some(RejectionReason::DuplicateSubmission));
    assert_eq!(world.attempt_count().await, 1);
}

#[tokio::test]
async fn saving_answers_needs_a_started_attempt() {
    let world = TestWorld::new().await;
    let quiz = world.add_quiz(capitals_quiz()).await;
    let service = &world.state.quiz_service;

    let early = service
        .save_answer(&caller(ANA), &quiz.id, 0, QuizAnswer::choice(1))
        .await;
    assert!(matches!(early, Err(AppError::BadRequest(_))));

    let status = service.start_timer(&caller(ANA), &quiz.id).await.expect("start");
    assert_eq!(status.deadline, None);
    let out_of_range = service
        .save_answer(&caller(ANA), &quiz.id, 9, QuizAnswer::choice(1))
        .await;
    assert!(matches!(out_of_range, Err(AppError::BadRequest(_))));

    // untimed sessions submit once, then retakes go straight through
    let first = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("submit");
    let second = service
        .submit_quiz_attempt(&caller(ANA), &quiz.id, correct_answers())
        .await
        .expect("retake");
    assert_eq!(first.result.attempt_number, Some(1));
    assert_eq!(second.result.attempt_number, Some(2));
}
