use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use quiz_core::model::{Attempt, OptionId};
use remote::{ApiError, QuizApi, SubmitRequest};

use super::controller::{SaveOutcome, SessionController};
use super::countdown::ClockEvent;
use super::submission::SubmitTrigger;
use crate::error::SessionError;
use crate::prompt::{Prompt, PromptReply, Prompter};

/// Something the candidate did in the attempt view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    SelectOption(OptionId),
    SetText(String),
    Clear,
    SaveAndNext,
    GoTo(usize),
    Submit,
    /// The view is going away without submitting.
    Leave,
}

/// Notifications for whoever renders the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Tick { remaining: Duration },
    Expired,
    Navigated { index: usize },
    AnswerRequired,
    LastQuestion,
    /// An action was refused; the message is candidate-presentable.
    Rejected(String),
    SubmitDeclined,
    Submitting(SubmitTrigger),
    SubmissionFailed { message: String, retryable: bool },
    Submitted(Attempt),
}

/// How a run ended without error.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Submitted(Attempt),
    /// Torn down before submission; any late result was dropped.
    Abandoned,
}

type InFlight = BoxFuture<'static, Result<Attempt, ApiError>>;
type Confirming = BoxFuture<'static, PromptReply>;

/// Drives a `SessionController` from clock ticks, candidate actions,
/// confirmation replies and submission results, one at a time.
pub struct AttemptRunner {
    session: SessionController,
    api: Arc<dyn QuizApi>,
    prompter: Arc<dyn Prompter>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl AttemptRunner {
    #[must_use]
    pub fn new(session: SessionController, api: Arc<dyn QuizApi>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            session,
            api,
            prompter,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Run until the attempt is submitted, fails terminally or the action
    /// channel closes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubmissionTerminal` when the automatic
    /// submission at expiry fails.
    pub async fn run(mut self, mut actions: mpsc::Receiver<SessionAction>) -> Result<SessionOutcome, SessionError> {
        let mut in_flight: Option<InFlight> = None;
        let mut confirming: Option<Confirming> = None;

        loop {
            tokio::select! {
                biased;

                outcome = poll_slot(&mut in_flight) => {
                    in_flight = None;
                    match self.session.complete_submission(outcome) {
                        Ok(Some(attempt)) => {
                            self.emit(SessionEvent::Submitted(attempt.clone()));
                            return Ok(SessionOutcome::Submitted(attempt));
                        }
                        Ok(None) => {}
                        Err(err) if err.is_fatal() => {
                            self.emit(SessionEvent::SubmissionFailed {
                                message: err.user_message(),
                                retryable: false,
                            });
                            return Err(err);
                        }
                        Err(err) => {
                            self.emit(SessionEvent::SubmissionFailed {
                                message: err.user_message(),
                                retryable: true,
                            });
                            if let Some(request) = self.session.submit_if_expired() {
                                in_flight = Some(self.dispatch(request, SubmitTrigger::Expiry));
                            }
                        }
                    }
                }

                event = self.session.next_clock_event() => {
                    match event {
                        ClockEvent::Tick { remaining } => self.emit(SessionEvent::Tick { remaining }),
                        ClockEvent::Expired => self.emit(SessionEvent::Expired),
                    }
                    if let Some(request) = self.session.handle_clock_event(event) {
                        in_flight = Some(self.dispatch(request, SubmitTrigger::Expiry));
                    }
                }

                reply = poll_slot(&mut confirming) => {
                    confirming = None;
                    match reply {
                        PromptReply::Accepted => {
                            if let Some(request) = self.session.request_submit() {
                                in_flight = Some(self.dispatch(request, SubmitTrigger::Candidate));
                            }
                        }
                        PromptReply::Declined => self.emit(SessionEvent::SubmitDeclined),
                    }
                }

                action = actions.recv() => match action {
                    None | Some(SessionAction::Leave) => {
                        self.session.dispose();
                        if in_flight.take().is_some() {
                            info!("dropping in-flight submission of attempt {}", self.session.attempt_id());
                        }
                        return Ok(SessionOutcome::Abandoned);
                    }
                    Some(SessionAction::Submit) => {
                        if !self.session.is_editable() {
                            self.emit(SessionEvent::Rejected(SessionError::SubmissionInProgress.user_message()));
                        } else if confirming.is_none() {
                            confirming = Some(self.ask_confirmation());
                        }
                    }
                    Some(action) => self.apply(action),
                },
            }
        }
    }

    fn apply(&mut self, action: SessionAction) {
        let result = match action {
            SessionAction::SelectOption(option) => self.session.select_option(option).map(|()| None),
            SessionAction::SetText(text) => self.session.set_text(text).map(|()| None),
            SessionAction::Clear => self.session.clear_current().map(|()| None),
            SessionAction::SaveAndNext => self.session.save_and_next().map(|outcome| {
                Some(match outcome {
                    SaveOutcome::AnswerRequired => SessionEvent::AnswerRequired,
                    SaveOutcome::Moved(index) => SessionEvent::Navigated { index },
                    SaveOutcome::LastQuestion => SessionEvent::LastQuestion,
                })
            }),
            SessionAction::GoTo(index) => self
                .session
                .go_to(index)
                .map(|moved| moved.then_some(SessionEvent::Navigated { index })),
            SessionAction::Submit | SessionAction::Leave => Ok(None),
        };
        match result {
            Ok(Some(event)) => self.emit(event),
            Ok(None) => {}
            Err(err) => {
                debug!("action refused: {err}");
                self.emit(SessionEvent::Rejected(err.user_message()));
            }
        }
    }

    fn ask_confirmation(&self) -> Confirming {
        let prompter = Arc::clone(&self.prompter);
        let prompt = Prompt::ConfirmSubmit {
            unanswered: self.session.unanswered_count(),
        };
        async move { prompter.confirm(prompt).await }.boxed()
    }

    fn dispatch(&self, request: SubmitRequest, trigger: SubmitTrigger) -> InFlight {
        self.emit(SessionEvent::Submitting(trigger));
        let api = Arc::clone(&self.api);
        async move { api.submit_attempt(&request).await }.boxed()
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                warn!("session observer went away");
            }
        }
    }
}

/// Await the future in `slot`, or never resolve if it is empty.
async fn poll_slot<F: Future + Unpin>(slot: &mut Option<F>) -> F::Output {
    match slot.as_mut() {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}
