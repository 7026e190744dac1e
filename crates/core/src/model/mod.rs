mod answer;
mod attempt;
mod ids;
mod quiz;

pub use ids::{AttemptId, OptionId, ParseIdError, QuestionId, QuizId};

pub use answer::{AnswerEntry, AnswerStatus, AnswerSubmission};
pub use attempt::{Attempt, AttemptError, AttemptReview, AttemptStatus, ReviewedAnswer};
pub use quiz::{Question, QuestionKind, Quiz, QuizError, QuizOption, QuizSummary};
