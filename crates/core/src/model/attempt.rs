use std::fmt;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, OptionId, QuestionId, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("score ({score}) exceeds total points ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// Lifecycle status as reported by the scoring service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    InProgress,
    Evaluated,
    Other(String),
}

impl AttemptStatus {
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "IN_PROGRESS" => Self::InProgress,
            "EVALUATED" => Self::Evaluated,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("IN_PROGRESS"),
            Self::Evaluated => f.write_str("EVALUATED"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// One candidate's timed run through a quiz.
///
/// The server owns every field; the client only ever replaces a whole
/// `Attempt` with a newer server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    id: AttemptId,
    quiz_id: QuizId,
    quiz_title: Option<String>,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    score: Option<u32>,
    total_points: Option<u32>,
    status: AttemptStatus,
    elapsed: Option<Duration>,
    exceeded_time_limit: bool,
}

impl Attempt {
    #[cfg(test)]
    fn started(id: AttemptId, quiz_id: QuizId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            quiz_id,
            quiz_title: None,
            started_at,
            submitted_at: None,
            score: None,
            total_points: None,
            status: AttemptStatus::InProgress,
            elapsed: None,
            exceeded_time_limit: false,
        }
    }

    /// Rehydrate an attempt from a server response.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if timestamps are inverted or the score exceeds the total.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AttemptId,
        quiz_id: QuizId,
        quiz_title: Option<String>,
        started_at: DateTime<Utc>,
        submitted_at: Option<DateTime<Utc>>,
        score: Option<u32>,
        total_points: Option<u32>,
        status: AttemptStatus,
        elapsed: Option<Duration>,
        exceeded_time_limit: bool,
    ) -> Result<Self, AttemptError> {
        if submitted_at.is_some_and(|at| at < started_at) {
            return Err(AttemptError::InvalidTimeRange);
        }
        if let (Some(score), Some(total)) = (score, total_points) {
            if score > total {
                return Err(AttemptError::ScoreExceedsTotal { score, total });
            }
        }

        Ok(Self {
            id,
            quiz_id,
            quiz_title,
            started_at,
            submitted_at,
            score,
            total_points,
            status,
            elapsed,
            exceeded_time_limit,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn quiz_title(&self) -> Option<&str> {
        self.quiz_title.as_deref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    #[must_use]
    pub fn total_points(&self) -> Option<u32> {
        self.total_points
    }

    #[must_use]
    pub fn status(&self) -> &AttemptStatus {
        &self.status
    }

    /// Server-measured time between start and submission.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    #[must_use]
    pub fn exceeded_time_limit(&self) -> bool {
        self.exceeded_time_limit
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Score as a whole percentage of the total, rounded half up.
    #[must_use]
    pub fn score_percent(&self) -> Option<u32> {
        let (score, total) = (self.score?, self.total_points?);
        if total == 0 {
            return None;
        }
        let scaled = u64::from(score) * 200 + u64::from(total);
        u32::try_from(scaled / (u64::from(total) * 2)).ok()
    }
}

/// Graded answer row shown on the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewedAnswer {
    pub question_id: QuestionId,
    pub question_text: String,
    pub points: u32,
    pub selected_option: Option<OptionId>,
    pub selected_option_text: Option<String>,
    pub text_answer: Option<String>,
    pub correct: Option<bool>,
    pub points_earned: u32,
}

/// A finalized attempt together with its per-question review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReview {
    pub attempt: Attempt,
    pub answers: Vec<ReviewedAnswer>,
}

impl AttemptReview {
    /// Number of rows the scorer marked correct.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|a| a.correct == Some(true))
            .count()
    }
}
