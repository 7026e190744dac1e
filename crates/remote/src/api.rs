use async_trait::async_trait;
use quiz_core::model::{
    AnswerSubmission, Attempt, AttemptId, AttemptReview, Quiz, QuizId, QuizSummary,
};

use crate::error::ApiError;

/// Payload of the submit call: only answered questions are listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub attempt_id: AttemptId,
    pub answers: Vec<AnswerSubmission>,
}

/// Contract of the remote quiz/scoring service consumed by an attempt session.
#[async_trait]
pub trait QuizApi: Send + Sync {
    /// Active quizzes the candidate may start.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unsuccessful envelope.
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, ApiError>;

    /// Fetch the candidate-facing definition of a quiz.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, an unsuccessful envelope or an
    /// invalid quiz definition.
    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ApiError>;

    /// Create a new attempt; the server records the start timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unsuccessful envelope.
    async fn start_attempt(&self, quiz_id: QuizId) -> Result<Attempt, ApiError>;

    /// Finalize an attempt and receive the scored result.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unsuccessful envelope.
    async fn submit_attempt(&self, request: &SubmitRequest) -> Result<Attempt, ApiError>;

    /// Fetch a finalized attempt together with its per-question review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unsuccessful envelope.
    async fn fetch_attempt(&self, attempt_id: AttemptId) -> Result<AttemptReview, ApiError>;

    /// Every attempt made by the authenticated candidate.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure or an unsuccessful envelope.
    async fn list_attempts(&self) -> Result<Vec<Attempt>, ApiError>;
}
