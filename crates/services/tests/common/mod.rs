#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use quiz_core::model::{OptionId, Question, QuestionId, QuestionKind, Quiz, QuizId, QuizOption};
use quiz_core::time::fixed_now;
use remote::{AuthContext, InMemoryQuizApi};
use services::{
    AttemptRunner, ManualScheduler, Prompt, PromptReply, Prompter, Scheduler, SessionAction,
    SessionController, SessionError, SessionEvent, SessionOutcome,
};

pub const QUIZ: QuizId = QuizId::new(42);

/// Option `q*10 + 1` is correct for question `q`.
pub fn correct(question: u64) -> OptionId {
    OptionId::new(question * 10 + 1)
}

pub fn wrong(question: u64) -> OptionId {
    OptionId::new(question * 10 + 2)
}

/// Three one-point multiple choice questions, one minute.
pub fn three_question_quiz() -> (Quiz, HashMap<QuestionId, OptionId>) {
    let questions = (1..=3)
        .map(|q| {
            Question::new(
                QuestionId::new(q),
                format!("Question {q}"),
                QuestionKind::MultipleChoice,
                1,
                vec![
                    QuizOption::new(correct(q), "right"),
                    QuizOption::new(wrong(q), "wrong"),
                ],
            )
            .unwrap()
        })
        .collect();
    let quiz = Quiz::new(QUIZ, "Scenario quiz", None, 1, questions).unwrap();
    let key = (1..=3).map(|q| (QuestionId::new(q), correct(q))).collect();
    (quiz, key)
}

pub fn candidate() -> AuthContext {
    AuthContext::candidate("ada", "token")
}

pub fn fixtures() -> (InMemoryQuizApi, ManualScheduler) {
    let scheduler = ManualScheduler::starting_at(fixed_now());
    let api = InMemoryQuizApi::new(scheduler.clock());
    let (quiz, key) = three_question_quiz();
    api.insert_quiz(quiz, key);
    (api, scheduler)
}

pub async fn bootstrap(api: &InMemoryQuizApi, scheduler: &ManualScheduler) -> SessionController {
    SessionController::bootstrap(api, candidate(), QUIZ, scheduler)
        .await
        .unwrap()
}

/// Never answers; stands in for a candidate staring at the dialog.
pub struct Undecided;

#[async_trait]
impl Prompter for Undecided {
    async fn confirm(&self, _prompt: Prompt) -> PromptReply {
        std::future::pending().await
    }
}

/// A running `AttemptRunner` plus the handles a test pokes it with.
pub struct Harness {
    pub api: InMemoryQuizApi,
    pub scheduler: ManualScheduler,
    pub actions: mpsc::Sender<SessionAction>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub seen: Vec<SessionEvent>,
    pub run: JoinHandle<Result<SessionOutcome, SessionError>>,
}

impl Harness {
    pub async fn start(prompter: impl Prompter + 'static) -> Self {
        let (api, scheduler) = fixtures();
        Self::start_with(api, scheduler, prompter).await
    }

    pub async fn start_with(
        api: InMemoryQuizApi,
        scheduler: ManualScheduler,
        prompter: impl Prompter + 'static,
    ) -> Self {
        let session = bootstrap(&api, &scheduler).await;
        let (actions, action_rx) = mpsc::channel(16);
        let (event_tx, events) = mpsc::unbounded_channel();
        let runner = AttemptRunner::new(session, Arc::new(api.clone()), Arc::new(prompter))
            .with_events(event_tx);
        let run = tokio::spawn(runner.run(action_rx));
        Self {
            api,
            scheduler,
            actions,
            events,
            seen: Vec::new(),
            run,
        }
    }

    pub async fn send(&self, action: SessionAction) {
        self.actions.send(action).await.unwrap();
    }

    /// Wait for the first event matching `pred`, remembering everything seen.
    pub async fn wait_for(&mut self, pred: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        let found = tokio::time::timeout(StdDuration::from_secs(5), async {
            while let Some(event) = self.events.recv().await {
                self.seen.push(event.clone());
                if pred(&event) {
                    return Some(event);
                }
            }
            None
        })
        .await
        .expect("timed out waiting for session event");
        found.expect("runner stopped before the expected event")
    }

    pub async fn finish(self) -> Result<SessionOutcome, SessionError> {
        tokio::time::timeout(StdDuration::from_secs(5), self.run)
            .await
            .expect("runner did not finish")
            .unwrap()
    }
}
