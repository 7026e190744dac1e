#![forbid(unsafe_code)]

pub mod attempt;
pub mod catalog;
pub mod error;
pub mod prompt;
pub mod results;
pub mod scheduler;

pub use quiz_core::Clock;

pub use attempt::{
    AttemptRunner, ClockEvent, SaveOutcome, SessionAction, SessionController, SessionEvent,
    SessionOutcome, SubmissionPhase, SubmitTrigger,
};
pub use catalog::QuizCatalog;
pub use error::{BootstrapStage, BufferError, SessionError};
pub use prompt::{AutoReply, Prompt, PromptReply, Prompter};
pub use results::{ResultSummary, ResultsService};
pub use scheduler::{IntervalTicker, ManualScheduler, Scheduler, Ticker, TokioScheduler};
