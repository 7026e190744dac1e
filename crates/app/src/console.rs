//! Line-oriented terminal front end for one attempt.

use std::io::BufRead;

use async_trait::async_trait;
use log::debug;
use tokio::sync::{mpsc, oneshot};

use quiz_core::model::{AttemptReview, Question, Quiz};
use quiz_core::time::{format_countdown, is_low_time};
use services::{Prompt, PromptReply, Prompter, ResultSummary, SessionAction, SessionEvent, SubmitTrigger};

pub type PromptRequest = (Prompt, oneshot::Sender<PromptReply>);

/// Something typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 1-based option number on the current question.
    Choose(usize),
    Text(String),
    Clear,
    Next,
    /// 1-based question number.
    GoTo(usize),
    Submit,
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').map_or((line, ""), |(h, r)| (h, r.trim()));
    match head {
        "c" | "clear" => Ok(Command::Clear),
        "n" | "next" => Ok(Command::Next),
        "s" | "submit" => Ok(Command::Submit),
        "q" | "quit" => Ok(Command::Quit),
        "?" | "h" | "help" => Ok(Command::Help),
        "t" | "text" => Ok(Command::Text(rest.to_string())),
        "g" | "goto" => rest
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::GoTo)
            .ok_or_else(|| format!("expected a question number, got '{rest}'")),
        number => number
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::Choose)
            .ok_or_else(|| format!("unknown command '{line}', type ? for help")),
    }
}

/// Asks through the console task and waits for its answer.
pub struct ConsolePrompter {
    requests: mpsc::Sender<PromptRequest>,
}

impl ConsolePrompter {
    #[must_use]
    pub fn new(requests: mpsc::Sender<PromptRequest>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn confirm(&self, prompt: Prompt) -> PromptReply {
        let (reply, answer) = oneshot::channel();
        if self.requests.send((prompt, reply)).await.is_err() {
            return PromptReply::Declined;
        }
        answer.await.unwrap_or(PromptReply::Declined)
    }
}

/// Read stdin on a plain thread so a blocked read never holds up shutdown.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub struct Console {
    quiz: Quiz,
    cursor: usize,
    actions: mpsc::Sender<SessionAction>,
    pending_reply: Option<oneshot::Sender<PromptReply>>,
}

impl Console {
    #[must_use]
    pub fn new(quiz: Quiz, actions: mpsc::Sender<SessionAction>) -> Self {
        Self {
            quiz,
            cursor: 0,
            actions,
            pending_reply: None,
        }
    }

    pub async fn drive(
        mut self,
        mut lines: mpsc::UnboundedReceiver<String>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        mut prompts: mpsc::Receiver<PromptRequest>,
    ) {
        print_help();
        self.show_question();
        loop {
            tokio::select! {
                Some(event) = events.recv() => self.on_event(event),
                Some((prompt, reply)) = prompts.recv() => {
                    println!("{prompt} [y/N]");
                    self.pending_reply = Some(reply);
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        debug!("stdin closed");
                        let _ = self.actions.send(SessionAction::Leave).await;
                        break;
                    };
                    if !self.on_line(&line).await {
                        break;
                    }
                }
                else => break,
            }
        }
    }

    async fn on_line(&mut self, line: &str) -> bool {
        if let Some(reply) = self.pending_reply.take() {
            let answer = if matches!(line.trim(), "y" | "Y" | "yes") {
                PromptReply::Accepted
            } else {
                PromptReply::Declined
            };
            let _ = reply.send(answer);
            return true;
        }

        let action = match parse_command(line) {
            Ok(Command::Help) => {
                print_help();
                return true;
            }
            Ok(Command::Choose(number)) => match self.current().options().get(number - 1) {
                Some(option) => SessionAction::SelectOption(option.id()),
                None => {
                    println!("no option {number} on this question");
                    return true;
                }
            },
            Ok(Command::Text(text)) => SessionAction::SetText(text),
            Ok(Command::Clear) => SessionAction::Clear,
            Ok(Command::Next) => SessionAction::SaveAndNext,
            Ok(Command::GoTo(number)) => SessionAction::GoTo(number - 1),
            Ok(Command::Submit) => SessionAction::Submit,
            Ok(Command::Quit) => SessionAction::Leave,
            Err(message) => {
                println!("{message}");
                return true;
            }
        };
        self.actions.send(action).await.is_ok()
    }

    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Tick { remaining } => {
                let seconds = remaining.num_seconds();
                let step = if is_low_time(remaining) { 30 } else { 300 };
                if seconds % step == 0 {
                    println!("[{} remaining]", format_countdown(remaining));
                }
            }
            SessionEvent::Expired => println!("Time is up."),
            SessionEvent::Navigated { index } => {
                self.cursor = index;
                self.show_question();
            }
            SessionEvent::AnswerRequired => println!("Please answer the question first."),
            SessionEvent::LastQuestion => println!("This is the last question. Type 's' to submit."),
            SessionEvent::Rejected(message) => println!("{message}"),
            SessionEvent::SubmitDeclined => println!("Submission cancelled."),
            SessionEvent::Submitting(SubmitTrigger::Candidate) => println!("Submitting..."),
            SessionEvent::Submitting(SubmitTrigger::Expiry) => {
                println!("Submitting your answers automatically...");
            }
            SessionEvent::SubmissionFailed { message, .. } => println!("{message}"),
            SessionEvent::Submitted(_) => println!("Quiz submitted."),
        }
    }

    fn current(&self) -> &Question {
        &self.quiz.questions()[self.cursor]
    }

    fn show_question(&self) {
        let question = self.current();
        println!();
        println!(
            "Question {} of {} ({} pt, {})",
            self.cursor + 1,
            self.quiz.question_count(),
            question.points(),
            question.kind()
        );
        println!("{}", question.text());
        for (number, option) in question.options().iter().enumerate() {
            println!("  {}) {}", number + 1, option.text());
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <n>        choose option n");
    println!("  t <text>   type a short answer");
    println!("  c          clear the current answer");
    println!("  n          save and go to the next question");
    println!("  g <n>      go to question n");
    println!("  s          submit");
    println!("  q          leave without submitting");
}

pub fn print_results(review: &AttemptReview) {
    println!();
    match ResultSummary::of(review) {
        Some(summary) => {
            println!(
                "Score: {}/{} ({}%)",
                summary.score, summary.total_points, summary.percent
            );
            if let Some(taken) = summary.time_taken {
                println!("Time taken: {taken}");
            }
            if summary.late {
                println!("Submitted after the time limit.");
            }
        }
        None => println!("Your attempt is awaiting evaluation."),
    }
    for answer in &review.answers {
        let mark = match answer.correct {
            Some(true) => "correct",
            Some(false) => "incorrect",
            None => "ungraded",
        };
        let given = answer
            .selected_option_text
            .as_deref()
            .or(answer.text_answer.as_deref())
            .unwrap_or("-");
        println!(
            "- {} [{mark}, {}/{} pt] {given}",
            answer.question_text, answer.points_earned, answer.points
        );
    }
}
