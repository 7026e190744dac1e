//! JSON shapes exchanged with the quiz service and their mapping to the domain.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use quiz_core::model::{
    AnswerSubmission, Attempt, AttemptId, AttemptReview, AttemptStatus, OptionId, Question,
    QuestionId, QuestionKind, Quiz, QuizId, QuizOption, QuizSummary, ReviewedAnswer,
};

use crate::api::SubmitRequest;
use crate::error::ApiError;

//
// ─── ENVELOPE ─────────────────────────────────────────────────────────────────
//

/// `{ success, data }` on success, `{ success: false, error }` otherwise.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request was not successful".to_owned());
            return Err(ApiError::Rejected(reason));
        }
        self.data.ok_or(ApiError::MissingData)
    }
}

/// Error bodies only; `data` is ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

impl ErrorEnvelope {
    pub(crate) fn reason(self) -> Option<String> {
        self.error.or(self.message)
    }
}

//
// ─── TIMESTAMPS ───────────────────────────────────────────────────────────────
//

/// Accepts RFC 3339 or an offset-less local timestamp, read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}

//
// ─── QUIZ ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptionDto {
    id: u64,
    option_text: String,
    /// Must never be populated for candidates; read only so a leak can be reported.
    #[serde(default)]
    is_correct: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuestionDto {
    id: u64,
    question_text: String,
    #[serde(rename = "type")]
    kind: String,
    points: u32,
    #[serde(default)]
    options: Vec<OptionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizDto {
    id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    duration: u32,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

impl QuestionDto {
    /// Returns the domain question and how many options leaked correctness.
    fn into_domain(self) -> Result<(Question, usize), ApiError> {
        let kind: QuestionKind = self.kind.parse().map_err(quiz_core::Error::from)?;
        let leaked = self.options.iter().filter(|o| o.is_correct.is_some()).count();
        let options = if kind.is_choice() {
            self.options
                .into_iter()
                .map(|o| QuizOption::new(OptionId::new(o.id), o.option_text))
                .collect()
        } else {
            if !self.options.is_empty() {
                warn!(
                    "short answer question {} came with {} option(s); ignored",
                    self.id,
                    self.options.len()
                );
            }
            Vec::new()
        };
        let question = Question::new(
            QuestionId::new(self.id),
            self.question_text,
            kind,
            self.points,
            options,
        )
        .map_err(quiz_core::Error::from)?;
        Ok((question, leaked))
    }
}

impl QuizDto {
    pub(crate) fn into_domain(self) -> Result<Quiz, ApiError> {
        let mut leaked = 0_usize;
        let mut questions = Vec::with_capacity(self.questions.len());
        for dto in self.questions {
            let (question, leaks) = dto.into_domain()?;
            leaked += leaks;
            questions.push(question);
        }
        if leaked > 0 {
            warn!(
                "quiz {} exposed correctness on {leaked} option(s) to a candidate; discarded",
                self.id
            );
        }
        let quiz = Quiz::new(
            QuizId::new(self.id),
            self.title,
            self.description,
            self.duration,
            questions,
        )
        .map_err(quiz_core::Error::from)?;
        Ok(quiz)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizSummaryDto {
    id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    duration: u32,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    created_by: Option<String>,
    #[serde(default)]
    total_questions: Option<usize>,
}

impl QuizSummaryDto {
    /// `None` for quizzes the service marks inactive.
    pub(crate) fn into_domain(self) -> Option<QuizSummary> {
        if self.is_active == Some(false) {
            return None;
        }
        Some(QuizSummary {
            id: QuizId::new(self.id),
            title: self.title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            duration_minutes: self.duration,
            question_count: self.total_questions.unwrap_or(0),
            created_by: self.created_by,
        })
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttemptDto {
    id: u64,
    quiz_id: u64,
    #[serde(default)]
    quiz_title: Option<String>,
    #[serde(deserialize_with = "de_timestamp")]
    started_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    score: Option<u32>,
    #[serde(default)]
    total_points: Option<u32>,
    #[serde(default)]
    status: Option<String>,
    /// The service stores elapsed seconds under this name.
    #[serde(default)]
    time_taken_minutes: Option<i64>,
    #[serde(default)]
    exceeded_time_limit: Option<bool>,
}

impl AttemptDto {
    pub(crate) fn into_domain(self) -> Result<Attempt, ApiError> {
        let status = self
            .status
            .as_deref()
            .map_or(AttemptStatus::InProgress, AttemptStatus::from_wire);
        let attempt = Attempt::from_persisted(
            AttemptId::new(self.id),
            QuizId::new(self.quiz_id),
            self.quiz_title,
            self.started_at,
            self.submitted_at,
            self.score,
            self.total_points,
            status,
            self.time_taken_minutes.map(Duration::seconds),
            self.exceeded_time_limit.unwrap_or(false),
        )
        .map_err(quiz_core::Error::from)?;
        Ok(attempt)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CandidateAnswerDto {
    question: QuestionDto,
    #[serde(default)]
    selected_option: Option<OptionDto>,
    #[serde(default)]
    text_answer: Option<String>,
    #[serde(default)]
    correct: Option<bool>,
    #[serde(default)]
    points_earned: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetailedAttemptDto {
    #[serde(flatten)]
    attempt: AttemptDto,
    #[serde(default)]
    candidate_answers: Vec<CandidateAnswerDto>,
}

impl DetailedAttemptDto {
    pub(crate) fn into_domain(self) -> Result<AttemptReview, ApiError> {
        let attempt = self.attempt.into_domain()?;
        let answers = self
            .candidate_answers
            .into_iter()
            .map(|row| ReviewedAnswer {
                question_id: QuestionId::new(row.question.id),
                question_text: row.question.question_text,
                points: row.question.points,
                selected_option: row.selected_option.as_ref().map(|o| OptionId::new(o.id)),
                selected_option_text: row.selected_option.map(|o| o.option_text),
                text_answer: row.text_answer,
                correct: row.correct,
                points_earned: row.points_earned.unwrap_or(0),
            })
            .collect();
        Ok(AttemptReview { attempt, answers })
    }
}

//
// ─── SUBMIT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerBody {
    question_id: u64,
    selected_option_id: Option<u64>,
    text_answer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitBody {
    attempt_id: u64,
    answers: Vec<AnswerBody>,
}

impl From<&AnswerSubmission> for AnswerBody {
    fn from(answer: &AnswerSubmission) -> Self {
        Self {
            question_id: answer.question_id.value(),
            selected_option_id: answer.selected_option_id.map(|id| id.value()),
            text_answer: answer.text_answer.clone(),
        }
    }
}

impl From<&SubmitRequest> for SubmitBody {
    fn from(request: &SubmitRequest) -> Self {
        Self {
            attempt_id: request.attempt_id.value(),
            answers: request.answers.iter().map(AnswerBody::from).collect(),
        }
    }
}
