use log::{debug, error, info, warn};

use quiz_core::model::{Attempt, AttemptId};
use remote::{ApiError, SubmitRequest};

use super::answer_buffer::AnswerSnapshot;

/// What asked for the attempt to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Candidate,
    Expiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Submitting(SubmitTrigger),
    Submitted,
    Failed,
}

/// How a finished submit call was absorbed.
#[derive(Debug)]
pub enum SubmissionResolution {
    Accepted(Attempt),
    /// Candidate-triggered failure; the coordinator is idle again.
    Retryable(ApiError),
    /// Expiry-triggered failure; nothing further will be sent.
    Terminal(ApiError),
}

/// Makes sure an attempt is submitted over the network at most once.
#[derive(Debug, Clone)]
pub struct SubmissionCoordinator {
    attempt_id: AttemptId,
    phase: SubmissionPhase,
    transitions: Vec<SubmissionPhase>,
    issued: usize,
}

impl SubmissionCoordinator {
    #[must_use]
    pub fn new(attempt_id: AttemptId) -> Self {
        Self {
            attempt_id,
            phase: SubmissionPhase::Idle,
            transitions: vec![SubmissionPhase::Idle],
            issued: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`.
    #[must_use]
    pub fn transitions(&self) -> &[SubmissionPhase] {
        &self.transitions
    }

    /// Number of submit requests handed out.
    #[must_use]
    pub fn requests_issued(&self) -> usize {
        self.issued
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == SubmissionPhase::Idle
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<SubmitTrigger> {
        match self.phase {
            SubmissionPhase::Submitting(trigger) => Some(trigger),
            _ => None,
        }
    }

    /// Claim the single submission slot.
    ///
    /// Returns the request to send, or `None` if the trigger arrived while a
    /// submission was in flight or already done.
    pub fn begin(&mut self, trigger: SubmitTrigger, snapshot: &AnswerSnapshot) -> Option<SubmitRequest> {
        if !self.is_idle() {
            debug!("ignoring {trigger:?} submit trigger in phase {:?}", self.phase);
            return None;
        }
        self.enter(SubmissionPhase::Submitting(trigger));
        self.issued += 1;
        let answers = snapshot.submissions();
        info!(
            "submitting attempt {} ({trigger:?}, {} answers)",
            self.attempt_id,
            answers.len()
        );
        Some(SubmitRequest {
            attempt_id: self.attempt_id,
            answers,
        })
    }

    /// Absorb the outcome of the call issued by [`Self::begin`].
    ///
    /// Returns `None` for an outcome that arrives with nothing in flight.
    pub fn resolve(&mut self, outcome: Result<Attempt, ApiError>) -> Option<SubmissionResolution> {
        let Some(trigger) = self.in_flight() else {
            debug!("discarding stale submission outcome in phase {:?}", self.phase);
            return None;
        };
        let resolution = match (outcome, trigger) {
            (Ok(attempt), _) => {
                self.enter(SubmissionPhase::Submitted);
                info!("attempt {} submitted", self.attempt_id);
                SubmissionResolution::Accepted(attempt)
            }
            (Err(err), SubmitTrigger::Candidate) => {
                self.enter(SubmissionPhase::Failed);
                warn!("submission of attempt {} failed, candidate may retry: {err}", self.attempt_id);
                self.enter(SubmissionPhase::Idle);
                SubmissionResolution::Retryable(err)
            }
            (Err(err), SubmitTrigger::Expiry) => {
                self.enter(SubmissionPhase::Failed);
                error!("automatic submission of attempt {} failed: {err}", self.attempt_id);
                SubmissionResolution::Terminal(err)
            }
        };
        Some(resolution)
    }

    fn enter(&mut self, phase: SubmissionPhase) {
        self.phase = phase;
        self.transitions.push(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AttemptStatus, OptionId, Question, QuestionId, QuestionKind, Quiz, QuizId, QuizOption};
    use quiz_core::time::fixed_now;

    use crate::attempt::answer_buffer::AnswerBuffer;

    fn buffer() -> AnswerBuffer {
        let question = Question::new(
            QuestionId::new(1),
            "Sky is blue",
            QuestionKind::TrueFalse,
            1,
            vec![QuizOption::new(OptionId::new(1), "True"), QuizOption::new(OptionId::new(2), "False")],
        )
        .unwrap();
        let quiz = Quiz::new(QuizId::new(1), "Quiz", None, 1, vec![question]).unwrap();
        AnswerBuffer::for_quiz(&quiz)
    }

    fn submitted() -> Attempt {
        Attempt::from_persisted(
            AttemptId::new(7),
            QuizId::new(1),
            None,
            fixed_now(),
            Some(fixed_now()),
            Some(1),
            Some(1),
            AttemptStatus::Evaluated,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn only_the_first_trigger_gets_a_request() {
        let mut coordinator = SubmissionCoordinator::new(AttemptId::new(7));
        let snapshot = buffer().snapshot();

        assert!(coordinator.begin(SubmitTrigger::Candidate, &snapshot).is_some());
        assert!(coordinator.begin(SubmitTrigger::Expiry, &snapshot).is_none());
        assert!(coordinator.begin(SubmitTrigger::Candidate, &snapshot).is_none());
        assert_eq!(coordinator.requests_issued(), 1);
        assert_eq!(coordinator.in_flight(), Some(SubmitTrigger::Candidate));
    }

    #[test]
    fn payload_lists_answered_questions_only() {
        let mut answers = buffer();
        let mut coordinator = SubmissionCoordinator::new(AttemptId::new(7));
        let empty = coordinator.begin(SubmitTrigger::Candidate, &answers.snapshot()).unwrap();
        assert!(empty.answers.is_empty());
        coordinator.resolve(Err(ApiError::MissingData));

        answers.select_option(QuestionId::new(1), OptionId::new(2)).unwrap();
        let request = coordinator.begin(SubmitTrigger::Candidate, &answers.snapshot()).unwrap();
        assert_eq!(request.attempt_id, AttemptId::new(7));
        assert_eq!(request.answers.len(), 1);
        assert_eq!(request.answers[0].selected_option_id, Some(OptionId::new(2)));
    }

    #[test]
    fn candidate_failure_can_be_retried() {
        let mut coordinator = SubmissionCoordinator::new(AttemptId::new(7));
        let snapshot = buffer().snapshot();

        coordinator.begin(SubmitTrigger::Candidate, &snapshot).unwrap();
        assert!(matches!(
            coordinator.resolve(Err(ApiError::Unavailable("down".into()))),
            Some(SubmissionResolution::Retryable(_))
        ));
        coordinator.begin(SubmitTrigger::Candidate, &snapshot).unwrap();
        assert!(matches!(
            coordinator.resolve(Ok(submitted())),
            Some(SubmissionResolution::Accepted(_))
        ));

        assert_eq!(
            coordinator.transitions(),
            [
                SubmissionPhase::Idle,
                SubmissionPhase::Submitting(SubmitTrigger::Candidate),
                SubmissionPhase::Failed,
                SubmissionPhase::Idle,
                SubmissionPhase::Submitting(SubmitTrigger::Candidate),
                SubmissionPhase::Submitted,
            ]
        );
        assert_eq!(coordinator.requests_issued(), 2);
    }

    #[test]
    fn expiry_failure_is_terminal() {
        let mut coordinator = SubmissionCoordinator::new(AttemptId::new(7));
        let snapshot = buffer().snapshot();

        coordinator.begin(SubmitTrigger::Expiry, &snapshot).unwrap();
        assert!(matches!(
            coordinator.resolve(Err(ApiError::Unavailable("down".into()))),
            Some(SubmissionResolution::Terminal(_))
        ));
        assert_eq!(coordinator.phase(), SubmissionPhase::Failed);
        assert!(coordinator.begin(SubmitTrigger::Candidate, &snapshot).is_none());
    }

    #[test]
    fn outcome_without_a_request_is_stale() {
        let mut coordinator = SubmissionCoordinator::new(AttemptId::new(7));
        assert!(coordinator.resolve(Ok(submitted())).is_none());
        assert_eq!(coordinator.phase(), SubmissionPhase::Idle);
    }
}
