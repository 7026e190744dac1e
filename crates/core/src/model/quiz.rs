use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, QuizId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Validation failures for a quiz definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz duration must be at least one minute")]
    InvalidDuration,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("question {0} must be worth at least one point")]
    InvalidPoints(QuestionId),

    #[error("question {question} lists option {option} more than once")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("short answer question {0} cannot carry options")]
    UnexpectedOptions(QuestionId),

    #[error("question {question} has {count} options, {kind} needs {expected}")]
    OptionCount {
        question: QuestionId,
        kind: QuestionKind,
        count: usize,
        expected: &'static str,
    },

    #[error("unknown question type: {0}")]
    UnknownKind(String),
}

//
// ─── QUESTION KIND ────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    /// True for kinds answered by picking an option.
    #[must_use]
    pub fn is_choice(self) -> bool {
        matches!(self, Self::MultipleChoice | Self::TrueFalse)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "MULTIPLE_CHOICE",
            Self::TrueFalse => "TRUE_FALSE",
            Self::ShortAnswer => "SHORT_ANSWER",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MULTIPLE_CHOICE" => Ok(Self::MultipleChoice),
            "TRUE_FALSE" => Ok(Self::TrueFalse),
            "SHORT_ANSWER" => Ok(Self::ShortAnswer),
            other => Err(QuizError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── OPTION ───────────────────────────────────────────────────────────────────
//

/// A selectable answer as shown to the candidate.
///
/// Deliberately has no correctness field: grading happens server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    id: OptionId,
    text: String,
}

impl QuizOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    kind: QuestionKind,
    points: u32,
    options: Vec<QuizOption>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when points are zero, option ids repeat, a choice
    /// question has no options or a short answer carries some.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        kind: QuestionKind,
        points: u32,
        options: Vec<QuizOption>,
    ) -> Result<Self, QuizError> {
        if points == 0 {
            return Err(QuizError::InvalidPoints(id));
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.id()) {
                return Err(QuizError::DuplicateOption {
                    question: id,
                    option: option.id(),
                });
            }
        }

        match kind {
            QuestionKind::ShortAnswer if !options.is_empty() => {
                return Err(QuizError::UnexpectedOptions(id));
            }
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse if options.is_empty() => {
                return Err(QuizError::OptionCount {
                    question: id,
                    kind,
                    count: 0,
                    expected: "at least 1",
                });
            }
            _ => {}
        }

        Ok(Self {
            id,
            text: text.into(),
            kind,
            points,
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    #[must_use]
    pub fn has_option(&self, option_id: OptionId) -> bool {
        self.options.iter().any(|o| o.id() == option_id)
    }
}

//
// ─── QUIZ ─────────────────────────────────────────────────────────────────────
//

/// Candidate-facing quiz definition. Immutable once an attempt starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: Option<String>,
    duration_minutes: u32,
    questions: Vec<Question>,
}

impl Quiz {
    /// Build a validated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for an empty title, a zero duration or repeated
    /// question ids.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        description: Option<String>,
        duration_minutes: u32,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if duration_minutes == 0 {
            return Err(QuizError::InvalidDuration);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestion(question.id()));
            }
        }

        Ok(Self {
            id,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            duration_minutes,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Time limit as a `chrono::Duration`.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_by_id(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// Sum of all question points.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points()))
    }
}

/// Catalogue entry for a quiz the candidate may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub id: QuizId,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub question_count: usize,
    pub created_by: Option<String>,
}
