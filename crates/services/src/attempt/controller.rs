use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use quiz_core::model::{
    AnswerEntry, AnswerStatus, Attempt, AttemptId, OptionId, Question, Quiz, QuizId,
};
use remote::{ApiError, AuthContext, QuizApi, SubmitRequest};

use super::answer_buffer::AnswerBuffer;
use super::countdown::{ClockEvent, CountdownClock};
use super::navigator::{Advance, ProgressSummary, QuestionNavigator};
use super::submission::{SubmissionCoordinator, SubmissionPhase, SubmissionResolution, SubmitTrigger};
use crate::error::{BootstrapStage, SessionError};
use crate::scheduler::Scheduler;

/// Result of "save and next".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The current question has no answer yet; nothing changed.
    AnswerRequired,
    Moved(usize),
    /// Saved, but there is no next question. Submitting is a separate step.
    LastQuestion,
}

/// One candidate's live attempt: answers, cursor, countdown and submission.
///
/// Owns all session state; every method runs to completion without
/// awaiting, except [`Self::bootstrap`] and [`Self::next_clock_event`].
#[derive(Debug)]
pub struct SessionController {
    auth: AuthContext,
    quiz: Quiz,
    attempt: Attempt,
    answers: AnswerBuffer,
    navigator: QuestionNavigator,
    countdown: CountdownClock,
    submission: SubmissionCoordinator,
    result: Option<Attempt>,
}

impl SessionController {
    /// Fetch the quiz, start an attempt and start the countdown.
    ///
    /// The deadline is the server's start timestamp plus the quiz duration,
    /// with the start pulled into the local window around the start call.
    ///
    /// # Errors
    ///
    /// Returns a fatal `SessionError` if the user is not a candidate, the quiz
    /// has no questions or either collaborator call fails. No timer is started
    /// in that case.
    pub async fn bootstrap(
        api: &dyn QuizApi,
        auth: AuthContext,
        quiz_id: QuizId,
        scheduler: &dyn Scheduler,
    ) -> Result<Self, SessionError> {
        if !auth.is_candidate() {
            return Err(SessionError::NotCandidate(auth.role().clone()));
        }

        info!("loading quiz {quiz_id} for {}", auth.candidate_name());
        let quiz = api
            .fetch_quiz(quiz_id)
            .await
            .map_err(|source| SessionError::Bootstrap {
                stage: BootstrapStage::FetchQuiz,
                source,
            })?;
        if quiz.question_count() == 0 {
            return Err(SessionError::EmptyQuiz);
        }
        let answers = AnswerBuffer::for_quiz(&quiz);

        let clock = scheduler.clock();
        let requested_at = clock.now();
        let attempt = api
            .start_attempt(quiz_id)
            .await
            .map_err(|source| SessionError::Bootstrap {
                stage: BootstrapStage::StartAttempt,
                source,
            })?;
        let started_at = local_start(attempt.started_at(), requested_at, clock.now());
        info!(
            "attempt {} started at {} ({} questions, {} min)",
            attempt.id(),
            attempt.started_at(),
            quiz.question_count(),
            quiz.duration_minutes()
        );

        let countdown =
            CountdownClock::start(started_at, quiz.duration(), clock, scheduler.periodic());

        Ok(Self {
            auth,
            navigator: QuestionNavigator::new(quiz.question_count()),
            submission: SubmissionCoordinator::new(attempt.id()),
            answers,
            countdown,
            quiz,
            attempt,
            result: None,
        })
    }

    #[must_use]
    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// The attempt as returned by the start call.
    #[must_use]
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt.id()
    }

    /// The scored attempt, once submission succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&Attempt> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.countdown.deadline()
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn countdown(&self) -> &CountdownClock {
        &self.countdown
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.navigator.cursor()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions()[self.navigator.cursor()]
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&AnswerEntry> {
        self.answers.entry(self.current_question().id())
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerBuffer {
        &self.answers
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<AnswerStatus> {
        self.navigator.statuses(&self.answers)
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSummary {
        self.navigator.progress(&self.answers)
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionCoordinator {
        &self.submission
    }

    #[must_use]
    pub fn submission_phase(&self) -> SubmissionPhase {
        self.submission.phase()
    }

    /// True while the candidate may still change answers or submit.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.submission.is_idle()
    }

    /// Choose an option on the current question.
    ///
    /// # Errors
    ///
    /// `UnknownOption` if the option is not offered by the current question,
    /// `SubmissionInProgress` once submission has started.
    pub fn select_option(&mut self, option: OptionId) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let question = self.current_question();
        if !question.has_option(option) {
            return Err(SessionError::UnknownOption {
                question: question.id(),
                option,
            });
        }
        let id = question.id();
        self.answers.select_option(id, option)?;
        Ok(())
    }

    /// Replace the free-text answer on the current question.
    ///
    /// # Errors
    ///
    /// `Buffer` if the current question is not a short answer,
    /// `SubmissionInProgress` once submission has started.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let id = self.current_question().id();
        self.answers.set_text(id, text)?;
        Ok(())
    }

    /// # Errors
    ///
    /// `SubmissionInProgress` once submission has started.
    pub fn clear_current(&mut self) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let id = self.current_question().id();
        self.answers.clear(id)?;
        Ok(())
    }

    /// Keep the current answer and move to the next question.
    ///
    /// # Errors
    ///
    /// `SubmissionInProgress` once submission has started.
    pub fn save_and_next(&mut self) -> Result<SaveOutcome, SessionError> {
        self.ensure_editable()?;
        let id = self.current_question().id();
        let answered = self.answers.entry(id).is_some_and(|entry| {
            entry.selected_option().is_some()
                || entry.text_answer().is_some_and(|text| !text.trim().is_empty())
        });
        if !answered {
            return Ok(SaveOutcome::AnswerRequired);
        }
        self.answers.mark_visited(id)?;
        Ok(match self.navigator.advance() {
            Advance::Moved(index) => SaveOutcome::Moved(index),
            Advance::AtEnd => SaveOutcome::LastQuestion,
        })
    }

    /// Jump to the question at `index`, marking the one being left visited.
    ///
    /// Returns `false` for an out-of-range index, leaving everything as is.
    ///
    /// # Errors
    ///
    /// `SubmissionInProgress` once submission has started.
    pub fn go_to(&mut self, index: usize) -> Result<bool, SessionError> {
        self.ensure_editable()?;
        if index >= self.navigator.count() {
            return Ok(false);
        }
        if index != self.navigator.cursor() {
            let leaving = self.current_question().id();
            self.answers.mark_visited(leaving)?;
        }
        Ok(self.navigator.go_to(index))
    }

    /// Questions without an answer, for the confirmation prompt.
    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        let progress = self.progress();
        progress.total - progress.answered
    }

    /// Candidate asked to submit. `None` if a submission already claimed the slot.
    pub fn request_submit(&mut self) -> Option<SubmitRequest> {
        self.begin_submission(SubmitTrigger::Candidate)
    }

    /// Feed a countdown event; expiry triggers the automatic submission.
    pub fn handle_clock_event(&mut self, event: ClockEvent) -> Option<SubmitRequest> {
        match event {
            ClockEvent::Tick { .. } => None,
            ClockEvent::Expired => self.begin_submission(SubmitTrigger::Expiry),
        }
    }

    /// Automatic submission for a deadline that passed while a candidate
    /// submission was in flight and then failed.
    pub fn submit_if_expired(&mut self) -> Option<SubmitRequest> {
        if self.countdown.has_expired() {
            self.begin_submission(SubmitTrigger::Expiry)
        } else {
            None
        }
    }

    /// Absorb the outcome of a submit call.
    ///
    /// Returns the scored attempt on success and `None` for an outcome that
    /// no longer matches an in-flight submission.
    ///
    /// # Errors
    ///
    /// `SubmissionRecoverable` when a candidate submission failed (answers
    /// unlock again), `SubmissionTerminal` when the expiry submission failed.
    pub fn complete_submission(
        &mut self,
        outcome: Result<Attempt, ApiError>,
    ) -> Result<Option<Attempt>, SessionError> {
        match self.submission.resolve(outcome) {
            None => Ok(None),
            Some(SubmissionResolution::Accepted(attempt)) => {
                self.countdown.cancel();
                self.result = Some(attempt.clone());
                Ok(Some(attempt))
            }
            Some(SubmissionResolution::Retryable(err)) => Err(SessionError::SubmissionRecoverable(err)),
            Some(SubmissionResolution::Terminal(err)) => {
                self.countdown.cancel();
                Err(SessionError::SubmissionTerminal(err))
            }
        }
    }

    /// Wait for the next countdown event. Pending forever once the clock stopped.
    pub async fn next_clock_event(&mut self) -> ClockEvent {
        self.countdown.next_event().await
    }

    /// Tear the session down: the countdown stops and releases its trigger.
    pub fn dispose(&mut self) {
        info!("disposing session for attempt {}", self.attempt.id());
        self.countdown.cancel();
    }

    fn begin_submission(&mut self, trigger: SubmitTrigger) -> Option<SubmitRequest> {
        let snapshot = self.answers.snapshot();
        self.submission.begin(trigger, &snapshot)
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        if self.submission.is_idle() {
            Ok(())
        } else {
            debug!("rejecting edit in phase {:?}", self.submission.phase());
            Err(SessionError::SubmissionInProgress)
        }
    }
}

/// The server's start time, held to when the start call was in flight locally.
fn local_start(
    server: DateTime<Utc>,
    requested_at: DateTime<Utc>,
    answered_at: DateTime<Utc>,
) -> DateTime<Utc> {
    let local = server.max(requested_at).min(answered_at);
    if local != server {
        warn!("server start {server} is outside the local window; counting from {local}");
    }
    local
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::attempt::countdown::ClockState;
    use crate::scheduler::ManualScheduler;
    use quiz_core::model::{QuestionId, QuestionKind, QuizOption};
    use quiz_core::Clock;
    use quiz_core::time::fixed_now;
    use remote::{InMemoryQuizApi, Role};

    fn auth() -> AuthContext {
        AuthContext::candidate("ada", "token")
    }

    fn quiz() -> Quiz {
        let choice = Question::new(
            QuestionId::new(1),
            "2 + 2?",
            QuestionKind::MultipleChoice,
            1,
            vec![
                QuizOption::new(OptionId::new(11), "3"),
                QuizOption::new(OptionId::new(12), "4"),
            ],
        )
        .unwrap();
        let text = Question::new(QuestionId::new(2), "Name a prime", QuestionKind::ShortAnswer, 2, Vec::new())
            .unwrap();
        Quiz::new(QuizId::new(5), "Arithmetic", None, 10, vec![choice, text]).unwrap()
    }

    async fn session() -> (SessionController, InMemoryQuizApi, ManualScheduler) {
        let scheduler = ManualScheduler::starting_at(fixed_now());
        let api = InMemoryQuizApi::new(scheduler.clock());
        api.insert_quiz(quiz(), HashMap::from([(QuestionId::new(1), OptionId::new(12))]));
        let session = SessionController::bootstrap(&api, auth(), QuizId::new(5), &scheduler)
            .await
            .unwrap();
        (session, api, scheduler)
    }

    #[tokio::test]
    async fn deadline_is_server_start_plus_duration() {
        let (session, _api, scheduler) = session().await;
        assert_eq!(session.deadline(), fixed_now() + Duration::minutes(10));
        assert_eq!(session.remaining(), Duration::minutes(10));
        assert_eq!(session.countdown().state(), ClockState::Running);
        assert!(scheduler.is_listening());
        assert_eq!(session.cursor(), 0);
    }

    async fn skewed_session(server_offset: Duration) -> (SessionController, ManualScheduler) {
        let scheduler = ManualScheduler::starting_at(fixed_now());
        let server = InMemoryQuizApi::new(Clock::fixed(fixed_now() + server_offset));
        server.insert_quiz(quiz(), HashMap::new());
        let session = SessionController::bootstrap(&server, auth(), QuizId::new(5), &scheduler)
            .await
            .unwrap();
        (session, scheduler)
    }

    #[tokio::test]
    async fn server_clock_ahead_cannot_extend_the_limit() {
        let (mut session, scheduler) = skewed_session(Duration::hours(3)).await;
        assert_eq!(session.deadline(), fixed_now() + Duration::minutes(10));

        scheduler.clock_handle().advance(Duration::minutes(10) + Duration::seconds(1));
        assert_eq!(session.countdown.observe(), Some(ClockEvent::Expired));
    }

    #[tokio::test]
    async fn server_clock_behind_cannot_cut_the_limit() {
        let (mut session, scheduler) = skewed_session(-Duration::hours(3)).await;
        assert_eq!(session.remaining(), Duration::minutes(10));
        assert!(matches!(session.countdown.observe(), Some(ClockEvent::Tick { .. })));

        scheduler.clock_handle().advance(Duration::minutes(9));
        assert_eq!(
            session.countdown.observe(),
            Some(ClockEvent::Tick {
                remaining: Duration::minutes(1)
            })
        );
        scheduler.clock_handle().advance(Duration::minutes(1));
        assert_eq!(session.countdown.observe(), Some(ClockEvent::Expired));
    }

    #[test]
    fn start_time_is_held_to_the_request_window() {
        let before = fixed_now();
        let after = before + Duration::seconds(2);
        let inside = before + Duration::seconds(1);
        assert_eq!(local_start(inside, before, after), inside);
        assert_eq!(local_start(before + Duration::hours(1), before, after), after);
        assert_eq!(local_start(before - Duration::hours(1), before, after), before);
    }

    #[tokio::test]
    async fn non_candidates_are_turned_away_before_any_call() {
        let scheduler = ManualScheduler::starting_at(fixed_now());
        let api = InMemoryQuizApi::new(scheduler.clock());
        api.insert_quiz(quiz(), HashMap::new());
        let admin = AuthContext::new("root", Role::Admin, "token".to_owned().into());

        let err = SessionController::bootstrap(&api, admin, QuizId::new(5), &scheduler)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotCandidate(Role::Admin)));
        assert_eq!(api.fetch_quiz_calls(), 0);
        assert!(!scheduler.is_listening());
    }

    #[tokio::test]
    async fn select_option_checks_the_current_question() {
        let (mut session, _api, _scheduler) = session().await;
        let err = session.select_option(OptionId::new(99)).unwrap_err();
        assert!(matches!(err, SessionError::UnknownOption { .. }));
        assert!(!session.answers().entry(QuestionId::new(1)).unwrap().has_answer());

        session.select_option(OptionId::new(11)).unwrap();
        session.select_option(OptionId::new(12)).unwrap();
        assert_eq!(
            session.current_answer().unwrap().selected_option(),
            Some(OptionId::new(12))
        );
    }

    #[tokio::test]
    async fn save_and_next_needs_a_non_blank_answer() {
        let (mut session, _api, _scheduler) = session().await;
        assert_eq!(session.save_and_next().unwrap(), SaveOutcome::AnswerRequired);
        assert_eq!(session.cursor(), 0);

        session.select_option(OptionId::new(12)).unwrap();
        assert_eq!(session.save_and_next().unwrap(), SaveOutcome::Moved(1));

        session.set_text("   ").unwrap();
        assert_eq!(session.save_and_next().unwrap(), SaveOutcome::AnswerRequired);
        session.set_text("7").unwrap();
        assert_eq!(session.save_and_next().unwrap(), SaveOutcome::LastQuestion);
        assert_eq!(session.cursor(), 1);
    }

    #[tokio::test]
    async fn leaving_a_question_marks_it_visited() {
        let (mut session, _api, _scheduler) = session().await;
        assert_eq!(
            session.statuses(),
            [AnswerStatus::NotVisited, AnswerStatus::NotVisited]
        );
        assert!(session.go_to(1).unwrap());
        assert!(!session.go_to(2).unwrap());
        assert_eq!(session.cursor(), 1);
        assert_eq!(
            session.statuses(),
            [AnswerStatus::Unanswered, AnswerStatus::NotVisited]
        );
    }

    #[tokio::test]
    async fn answers_are_locked_once_submission_starts() {
        let (mut session, _api, _scheduler) = session().await;
        session.select_option(OptionId::new(11)).unwrap();
        let request = session.request_submit().unwrap();
        assert_eq!(request.answers.len(), 1);

        assert!(matches!(
            session.select_option(OptionId::new(12)),
            Err(SessionError::SubmissionInProgress)
        ));
        assert!(matches!(session.clear_current(), Err(SessionError::SubmissionInProgress)));
        assert!(matches!(session.go_to(1), Err(SessionError::SubmissionInProgress)));
        assert!(session.request_submit().is_none());
        assert_eq!(
            session.current_answer().unwrap().selected_option(),
            Some(OptionId::new(11))
        );
    }

    #[tokio::test]
    async fn expiry_during_a_failed_candidate_submit_still_submits_once() {
        let (mut session, _api, scheduler) = session().await;
        session.request_submit().unwrap();

        scheduler.clock_handle().advance(Duration::minutes(10));
        assert_eq!(session.countdown.observe(), Some(ClockEvent::Expired));
        assert!(session.handle_clock_event(ClockEvent::Expired).is_none());

        let err = session
            .complete_submission(Err(ApiError::Unavailable("down".into())))
            .unwrap_err();
        assert!(!err.is_fatal());

        let follow_up = session.submit_if_expired();
        assert!(follow_up.is_some());
        assert_eq!(session.submission().in_flight(), Some(SubmitTrigger::Expiry));
        assert!(session.submit_if_expired().is_none());
    }
}
