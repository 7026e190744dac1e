mod common;

use chrono::Duration;

use common::{Harness, correct, wrong};
use quiz_core::model::{AttemptStatus, QuestionId};
use remote::QuizApi;
use services::{
    AutoReply, ResultSummary, ResultsService, SessionAction, SessionEvent, SessionOutcome,
    SubmissionPhase, SubmitTrigger,
};

#[tokio::test]
async fn manual_submit_sends_every_answer_once_and_stops_the_clock() {
    let mut h = Harness::start(AutoReply::accept()).await;

    for q in 1..=3 {
        h.send(SessionAction::SelectOption(correct(q))).await;
        h.send(SessionAction::SaveAndNext).await;
    }
    h.wait_for(|e| *e == SessionEvent::LastQuestion).await;

    h.scheduler.advance_secs(10);
    h.wait_for(|e| *e == SessionEvent::Tick { remaining: Duration::seconds(50) })
        .await;
    h.send(SessionAction::Submit).await;

    let (api, scheduler) = (h.api.clone(), h.scheduler.clone());
    let outcome = h.finish().await.unwrap();
    let SessionOutcome::Submitted(attempt) = outcome else {
        panic!("expected a submitted attempt, got {outcome:?}");
    };
    assert_eq!(attempt.score(), Some(3));
    assert_eq!(attempt.status(), &AttemptStatus::Evaluated);
    assert!(!attempt.exceeded_time_limit());

    assert_eq!(api.submit_calls(), 1);
    assert_eq!(api.submissions()[0].answers.len(), 3);
    assert!(!scheduler.is_listening());
}

#[tokio::test]
async fn expiry_submits_only_touched_questions() {
    let mut h = Harness::start(AutoReply::accept()).await;

    h.send(SessionAction::SelectOption(correct(1))).await;
    h.send(SessionAction::SaveAndNext).await;
    h.wait_for(|e| *e == SessionEvent::Navigated { index: 1 }).await;

    h.scheduler.advance_secs(60);
    h.wait_for(|e| *e == SessionEvent::Submitting(SubmitTrigger::Expiry))
        .await;

    let api = h.api.clone();
    let outcome = h.finish().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Submitted(_)));

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].answers.len(), 1);
    assert_eq!(submissions[0].answers[0].question_id, QuestionId::new(1));
}

#[tokio::test]
async fn changing_an_answer_keeps_only_the_last_choice() {
    let h = Harness::start(AutoReply::accept()).await;

    h.send(SessionAction::SelectOption(correct(1))).await;
    h.send(SessionAction::SelectOption(wrong(1))).await;
    h.send(SessionAction::Submit).await;

    let api = h.api.clone();
    let outcome = h.finish().await.unwrap();
    let SessionOutcome::Submitted(attempt) = outcome else {
        panic!("expected a submitted attempt, got {outcome:?}");
    };
    assert_eq!(attempt.score(), Some(0));

    let answers = &api.submissions()[0].answers;
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].selected_option_id, Some(wrong(1)));
}

#[tokio::test]
async fn failed_candidate_submit_can_be_retried() {
    let (api, scheduler) = common::fixtures();
    api.fail_next_submit("connection reset");
    let mut session = common::bootstrap(&api, &scheduler).await;
    session.select_option(correct(1)).unwrap();

    let request = session.request_submit().unwrap();
    let err = session
        .complete_submission(api.submit_attempt(&request).await)
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(session.is_editable());

    let request = session.request_submit().unwrap();
    let attempt = session
        .complete_submission(api.submit_attempt(&request).await)
        .unwrap()
        .unwrap();
    assert_eq!(attempt.score(), Some(1));

    assert_eq!(
        session.submission().transitions(),
        [
            SubmissionPhase::Idle,
            SubmissionPhase::Submitting(SubmitTrigger::Candidate),
            SubmissionPhase::Failed,
            SubmissionPhase::Idle,
            SubmissionPhase::Submitting(SubmitTrigger::Candidate),
            SubmissionPhase::Submitted,
        ]
    );
    assert_eq!(api.submit_calls(), 2);
    assert_eq!(session.result(), Some(&attempt));
    assert!(!scheduler.is_listening());
}

#[tokio::test]
async fn runner_reports_a_failed_submit_and_accepts_a_retry() {
    let (api, scheduler) = common::fixtures();
    api.fail_next_submit("connection reset");
    let mut h = Harness::start_with(api, scheduler, AutoReply::accept()).await;

    h.send(SessionAction::SelectOption(correct(1))).await;
    h.send(SessionAction::Submit).await;
    let failure = h
        .wait_for(|e| matches!(e, SessionEvent::SubmissionFailed { .. }))
        .await;
    assert!(matches!(
        failure,
        SessionEvent::SubmissionFailed { retryable: true, .. }
    ));

    h.send(SessionAction::SelectOption(wrong(1))).await;
    h.send(SessionAction::Submit).await;

    let api = h.api.clone();
    let outcome = h.finish().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Submitted(_)));
    let submissions = api.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].answers[0].selected_option_id, Some(wrong(1)));
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let mut h = Harness::start(AutoReply::decline()).await;

    h.send(SessionAction::Submit).await;
    h.wait_for(|e| *e == SessionEvent::SubmitDeclined).await;
    assert_eq!(h.api.submit_calls(), 0);

    h.send(SessionAction::Leave).await;
    let outcome = h.finish().await.unwrap();
    assert_eq!(outcome, SessionOutcome::Abandoned);
}

#[tokio::test]
async fn results_are_loaded_after_submission() {
    let h = Harness::start(AutoReply::accept()).await;
    h.send(SessionAction::SelectOption(correct(1))).await;
    h.send(SessionAction::GoTo(2)).await;
    h.send(SessionAction::SelectOption(wrong(3))).await;
    h.send(SessionAction::Submit).await;

    let api = h.api.clone();
    let SessionOutcome::Submitted(attempt) = h.finish().await.unwrap() else {
        panic!("expected a submitted attempt");
    };

    let results = ResultsService::new(std::sync::Arc::new(api));
    let review = results.load(attempt.id()).await.unwrap();
    assert_eq!(review.answers.len(), 2);
    assert_eq!(review.correct_count(), 1);

    let summary = ResultSummary::of(&review).unwrap();
    assert_eq!(summary.score, 1);
    assert_eq!(summary.total_points, 3);
    assert_eq!(summary.percent, 33);
    assert_eq!(summary.time_taken.as_deref(), Some("00:00:00"));
    assert!(!summary.late);
}

#[tokio::test]
async fn catalogue_and_history_reflect_finished_attempts() {
    let (api, scheduler) = common::fixtures();
    let extra = quiz_core::model::Quiz::new(
        quiz_core::model::QuizId::new(3),
        "Another quiz",
        Some("Warm-up".into()),
        5,
        common::three_question_quiz().0.questions().to_vec(),
    )
    .unwrap();
    api.insert_quiz(extra, Default::default());
    let shared: std::sync::Arc<dyn QuizApi> = std::sync::Arc::new(api.clone());

    let quizzes = services::QuizCatalog::new(shared.clone()).available().await.unwrap();
    let titles: Vec<&str> = quizzes.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(titles, ["Another quiz", "Scenario quiz"]);
    assert_eq!(quizzes[1].question_count, 3);

    let mut first = common::bootstrap(&api, &scheduler).await;
    first.select_option(correct(1)).unwrap();
    let request = first.request_submit().unwrap();
    first.complete_submission(api.submit_attempt(&request).await).unwrap();

    scheduler.clock_handle().advance(Duration::minutes(5));
    let second = common::bootstrap(&api, &scheduler).await;

    let history = ResultsService::new(shared).history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id(), second.attempt_id());
    assert_eq!(history[1].score(), Some(1));
    assert_eq!(history[0].status(), &AttemptStatus::InProgress);
}
