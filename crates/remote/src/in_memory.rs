use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use quiz_core::Clock;
use quiz_core::model::{
    AnswerSubmission, Attempt, AttemptId, AttemptReview, AttemptStatus, OptionId, QuestionId,
    Quiz, QuizId, QuizSummary, ReviewedAnswer,
};

use crate::api::{QuizApi, SubmitRequest};
use crate::error::ApiError;

struct StoredQuiz {
    quiz: Quiz,
    answer_key: HashMap<QuestionId, OptionId>,
}

struct StoredAttempt {
    attempt: Attempt,
    answers: Vec<AnswerSubmission>,
}

#[derive(Default)]
struct State {
    quizzes: HashMap<QuizId, StoredQuiz>,
    attempts: HashMap<AttemptId, StoredAttempt>,
    next_attempt_id: u64,
    fetch_quiz_failure: Option<String>,
    start_failure: Option<String>,
    submit_failures: VecDeque<String>,
    submissions: Vec<SubmitRequest>,
    fetch_quiz_calls: usize,
    start_calls: usize,
}

/// In-memory quiz service for tests and local prototyping.
///
/// Scores choice answers against an answer key it keeps to itself, so the
/// quizzes it hands out never carry correctness.
#[derive(Clone)]
pub struct InMemoryQuizApi {
    state: Arc<Mutex<State>>,
    clock: Clock,
    hold_submissions: Arc<AtomicBool>,
    release: Arc<Notify>,
}

impl InMemoryQuizApi {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_attempt_id: 1,
                ..State::default()
            })),
            clock,
            hold_submissions: Arc::new(AtomicBool::new(false)),
            release: Arc::new(Notify::new()),
        }
    }

    /// Register a quiz together with its server-side answer key.
    pub fn insert_quiz(&self, quiz: Quiz, answer_key: HashMap<QuestionId, OptionId>) {
        self.lock().quizzes.insert(quiz.id(), StoredQuiz { quiz, answer_key });
    }

    /// Make every subsequent quiz fetch fail with the given message.
    pub fn fail_fetch_quiz(&self, message: impl Into<String>) {
        self.lock().fetch_quiz_failure = Some(message.into());
    }

    /// Make every subsequent attempt start fail with the given message.
    pub fn fail_start(&self, message: impl Into<String>) {
        self.lock().start_failure = Some(message.into());
    }

    /// Queue a transport failure for the next submit call.
    pub fn fail_next_submit(&self, message: impl Into<String>) {
        self.lock().submit_failures.push_back(message.into());
    }

    /// Park submit calls until [`Self::release_submission`] is called.
    pub fn hold_submissions(&self) {
        self.hold_submissions.store(true, Ordering::SeqCst);
    }

    /// Let one parked (or the next) submit call proceed.
    pub fn release_submission(&self) {
        self.release.notify_one();
    }

    /// Every submit request received, including ones that failed.
    #[must_use]
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.lock().submissions.clone()
    }

    #[must_use]
    pub fn submit_calls(&self) -> usize {
        self.lock().submissions.len()
    }

    #[must_use]
    pub fn fetch_quiz_calls(&self) -> usize {
        self.lock().fetch_quiz_calls
    }

    #[must_use]
    pub fn start_calls(&self) -> usize {
        self.lock().start_calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, ApiError> {
        self.state
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))
    }

    fn evaluate(&self, request: &SubmitRequest) -> Result<Attempt, ApiError> {
        let now = self.clock.now();
        let mut guard = self.state()?;
        let state = &mut *guard;

        let stored = state
            .attempts
            .get_mut(&request.attempt_id)
            .ok_or_else(|| ApiError::Rejected("QuizAttempt not found".into()))?;
        if stored.attempt.status() != &AttemptStatus::InProgress {
            return Err(ApiError::Rejected("Quiz already submitted".into()));
        }
        let quiz = state
            .quizzes
            .get(&stored.attempt.quiz_id())
            .ok_or_else(|| ApiError::Rejected("Quiz not found".into()))?;

        let mut score = 0_u32;
        for answer in &request.answers {
            let question = quiz
                .quiz
                .question_by_id(answer.question_id)
                .ok_or_else(|| ApiError::Rejected(format!("Question {} not found", answer.question_id)))?;
            if let Some(selected) = answer.selected_option_id {
                if !question.has_option(selected) {
                    return Err(ApiError::Rejected(format!("Option {selected} not found")));
                }
                if quiz.answer_key.get(&question.id()) == Some(&selected) {
                    score = score.saturating_add(question.points());
                }
            }
        }

        let started_at = stored.attempt.started_at();
        let elapsed = now - started_at;
        let exceeded = elapsed.num_minutes() > i64::from(quiz.quiz.duration_minutes());
        let finalized = Attempt::from_persisted(
            stored.attempt.id(),
            stored.attempt.quiz_id(),
            Some(quiz.quiz.title().to_owned()),
            started_at,
            Some(now),
            Some(score),
            Some(quiz.quiz.total_points()),
            AttemptStatus::Evaluated,
            Some(elapsed),
            exceeded,
        )
        .map_err(quiz_core::Error::from)?;

        stored.attempt = finalized.clone();
        stored.answers = request.answers.clone();
        Ok(finalized)
    }
}

#[async_trait]
impl QuizApi for InMemoryQuizApi {
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError> {
        let state = self.state()?;
        let mut summaries: Vec<QuizSummary> = state
            .quizzes
            .values()
            .map(|stored| QuizSummary {
                id: stored.quiz.id(),
                title: stored.quiz.title().to_owned(),
                description: stored.quiz.description().map(str::to_owned),
                duration_minutes: stored.quiz.duration_minutes(),
                question_count: stored.quiz.question_count(),
                created_by: None,
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        Ok(summaries)
    }

    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ApiError> {
        let mut state = self.state()?;
        state.fetch_quiz_calls += 1;
        if let Some(message) = &state.fetch_quiz_failure {
            return Err(ApiError::Unavailable(message.clone()));
        }
        state
            .quizzes
            .get(&quiz_id)
            .map(|stored| stored.quiz.clone())
            .ok_or_else(|| ApiError::Rejected(format!("Quiz not found with id: {quiz_id}")))
    }

    async fn start_attempt(&self, quiz_id: QuizId) -> Result<Attempt, ApiError> {
        let now = self.clock.now();
        let mut state = self.state()?;
        state.start_calls += 1;
        if let Some(message) = &state.start_failure {
            return Err(ApiError::Unavailable(message.clone()));
        }
        let total = state
            .quizzes
            .get(&quiz_id)
            .map(|stored| stored.quiz.total_points())
            .ok_or_else(|| ApiError::Rejected(format!("Quiz not found with id: {quiz_id}")))?;

        let id = AttemptId::new(state.next_attempt_id);
        state.next_attempt_id += 1;
        let attempt = Attempt::from_persisted(
            id,
            quiz_id,
            None,
            now,
            None,
            None,
            Some(total),
            AttemptStatus::InProgress,
            None,
            false,
        )
        .map_err(quiz_core::Error::from)?;
        state.attempts.insert(
            id,
            StoredAttempt {
                attempt: attempt.clone(),
                answers: Vec::new(),
            },
        );
        Ok(attempt)
    }

    async fn submit_attempt(&self, request: &SubmitRequest) -> Result<Attempt, ApiError> {
        let scripted_failure = {
            let mut state = self.state()?;
            state.submissions.push(request.clone());
            state.submit_failures.pop_front()
        };

        if self.hold_submissions.load(Ordering::SeqCst) {
            self.release.notified().await;
        }

        if let Some(message) = scripted_failure {
            return Err(ApiError::Unavailable(message));
        }
        self.evaluate(request)
    }

    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptReview, ApiError> {
        let state = self.state()?;
        let stored = state
            .attempts
            .get(&attempt_id)
            .ok_or_else(|| ApiError::Rejected("QuizAttempt not found".into()))?;
        let quiz = state
            .quizzes
            .get(&stored.attempt.quiz_id())
            .ok_or_else(|| ApiError::Rejected("Quiz not found".into()))?;

        let answers = stored
            .answers
            .iter()
            .filter_map(|answer| {
                let question = quiz.quiz.question_by_id(answer.question_id)?;
                let selected_text = answer.selected_option_id.and_then(|id| {
                    question
                        .options()
                        .iter()
                        .find(|o| o.id() == id)
                        .map(|o| o.text().to_owned())
                });
                let correct = answer
                    .selected_option_id
                    .map(|id| quiz.answer_key.get(&question.id()) == Some(&id));
                Some(ReviewedAnswer {
                    question_id: question.id(),
                    question_text: question.text().to_owned(),
                    points: question.points(),
                    selected_option: answer.selected_option_id,
                    selected_option_text: selected_text,
                    text_answer: answer.text_answer.clone(),
                    correct,
                    points_earned: if correct == Some(true) { question.points() } else { 0 },
                })
            })
            .collect();

        Ok(AttemptReview {
            attempt: stored.attempt.clone(),
            answers,
        })
    }

    async fn list_attempts(&self) -> Result<Vec<Attempt>, ApiError> {
        let state = self.state()?;
        let mut attempts: Vec<Attempt> = state
            .attempts
            .values()
            .map(|stored| stored.attempt.clone())
            .collect();
        attempts.sort_by_key(Attempt::id);
        Ok(attempts)
    }
}
