use std::sync::Arc;

use log::info;

use quiz_core::model::{Attempt, AttemptId, AttemptReview};
use quiz_core::time::format_countdown;
use remote::QuizApi;

use crate::error::SessionError;

/// Loads the graded view of a submitted attempt.
#[derive(Clone)]
pub struct ResultsService {
    api: Arc<dyn QuizApi>,
}

impl ResultsService {
    #[must_use]
    pub fn new(api: Arc<dyn QuizApi>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Returns `SessionError::Results` if the attempt cannot be fetched.
    pub async fn load(&self, attempt_id: AttemptId) -> Result<AttemptReview, SessionError> {
        let review = self
            .api
            .fetch_attempt(attempt_id)
            .await
            .map_err(SessionError::Results)?;
        info!(
            "loaded results for attempt {attempt_id}: {}/{} correct",
            review.correct_count(),
            review.answers.len()
        );
        Ok(review)
    }

    /// The candidate's past attempts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Results` if the list cannot be fetched.
    pub async fn history(&self) -> Result<Vec<Attempt>, SessionError> {
        let mut attempts = self.api.list_attempts().await.map_err(SessionError::Results)?;
        attempts.sort_by(|a, b| b.started_at().cmp(&a.started_at()).then(b.id().cmp(&a.id())));
        Ok(attempts)
    }
}

/// Headline figures for the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub score: u32,
    pub total_points: u32,
    pub percent: u32,
    pub time_taken: Option<String>,
    pub late: bool,
}

impl ResultSummary {
    /// `None` until the attempt has been scored.
    #[must_use]
    pub fn of(review: &AttemptReview) -> Option<Self> {
        let attempt = &review.attempt;
        Some(Self {
            score: attempt.score()?,
            total_points: attempt.total_points()?,
            percent: attempt.score_percent()?,
            time_taken: attempt.elapsed().map(format_countdown),
            late: attempt.exceeded_time_limit(),
        })
    }
}
