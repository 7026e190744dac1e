//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use quiz_core::model::{OptionId, QuestionId, QuestionKind};
use remote::{ApiError, Role};

/// Errors emitted by `AnswerBuffer` mutators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BufferError {
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("question {question} is {kind}; it does not take {attempted}")]
    KindMismatch {
        question: QuestionId,
        kind: QuestionKind,
        attempted: &'static str,
    },
}

/// Which collaborator call failed while bootstrapping an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    FetchQuiz,
    StartAttempt,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapStage::FetchQuiz => f.write_str("load the quiz"),
            BootstrapStage::StartAttempt => f.write_str("start the attempt"),
        }
    }
}

/// Errors emitted by attempt sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("could not {stage}: {source}")]
    Bootstrap {
        stage: BootstrapStage,
        #[source]
        source: ApiError,
    },
    #[error("only candidates can take quizzes (role {0})")]
    NotCandidate(Role),
    #[error("quiz has no questions")]
    EmptyQuiz,
    #[error("option {option} does not belong to question {question}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
    #[error("answers are locked while the attempt is being submitted")]
    SubmissionInProgress,
    #[error("failed to submit quiz, please try again: {0}")]
    SubmissionRecoverable(#[source] ApiError),
    #[error("time expired and the automatic submission failed: {0}")]
    SubmissionTerminal(#[source] ApiError),
    #[error("could not load results: {0}")]
    Results(#[source] ApiError),
    #[error("could not load quizzes: {0}")]
    Catalog(#[source] ApiError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl SessionError {
    /// True for errors that end the session; the rest leave it usable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Bootstrap { .. }
                | SessionError::NotCandidate(_)
                | SessionError::EmptyQuiz
                | SessionError::SubmissionTerminal(_)
        )
    }

    /// Message suitable for showing to the candidate.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Bootstrap { stage, source } => {
                format!("Could not {stage}. {}", source.user_message())
            }
            SessionError::SubmissionRecoverable(source) => {
                format!("Failed to submit quiz. {}", source.user_message())
            }
            SessionError::SubmissionTerminal(source) => format!(
                "Time is up and your answers could not be submitted. {}",
                source.user_message()
            ),
            other => other.to_string(),
        }
    }
}
