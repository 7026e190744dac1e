//! A single timed attempt: answer state, navigation, countdown and submission.

mod answer_buffer;
mod controller;
mod countdown;
mod navigator;
mod runner;
mod submission;

pub use answer_buffer::{AnswerBuffer, AnswerSnapshot};
pub use controller::{SaveOutcome, SessionController};
pub use countdown::{ClockEvent, ClockState, CountdownClock};
pub use navigator::{Advance, ProgressSummary, QuestionNavigator};
pub use runner::{AttemptRunner, SessionAction, SessionEvent, SessionOutcome};
pub use submission::{SubmissionCoordinator, SubmissionPhase, SubmissionResolution, SubmitTrigger};
