use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use quiz_core::model::QuizId;
use quiz_core::time::format_countdown;
use remote::{HttpQuizApi, QuizApi};
use services::{
    AttemptRunner, QuizCatalog, ResultsService, SessionController, SessionOutcome, TokioScheduler,
};

mod config;
mod console;

use config::{Config, parse_quiz_id, parse_url};
use console::{Console, ConsolePrompter};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api-url value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--quiz-id <id>] [--api-url <url>]");
    eprintln!("  cargo run -p app -- --list     # available quizzes");
    eprintln!("  cargo run -p app -- --history  # your attempts");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api-url {}", config::DEFAULT_API_URL);
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  QUIZ_API_TOKEN (required), QUIZ_API_URL, QUIZ_ID, QUIZ_CANDIDATE,");
    eprintln!("  QUIZ_ROLE, QUIZ_TICK_MS, QUIZ_HTTP_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Take,
    List,
    History,
    Help,
}

#[derive(Debug, Default)]
struct Args {
    mode: Mode,
    quiz_id: Option<QuizId>,
    api_url: Option<url::Url>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    let id = parse_quiz_id("--quiz-id", &value)
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    parsed.quiz_id = Some(id);
                }
                "--api-url" => {
                    let value = require_value(args, "--api-url")?;
                    let url = parse_url("--api-url", &value)
                        .map_err(|_| ArgsError::InvalidApiUrl { raw: value.clone() })?;
                    parsed.api_url = Some(url);
                }
                "--list" => parsed.mode = Mode::List,
                "--history" => parsed.mode = Mode::History,
                "--help" | "-h" => parsed.mode = Mode::Help,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.mode == Mode::Help {
        print_usage();
        return Ok(());
    }

    let mut config = Config::from_env()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }

    let auth = config.auth_context();
    let api: Arc<dyn QuizApi> = Arc::new(HttpQuizApi::new(
        config.api_url.as_str(),
        auth.clone(),
        config.http_timeout,
    )?);

    let quiz_id = match (args.mode, args.quiz_id.or(config.quiz_id)) {
        (Mode::History, _) => return show_history(api).await,
        (Mode::Take, Some(quiz_id)) => quiz_id,
        _ => return show_catalog(api).await,
    };
    let scheduler = TokioScheduler::new(config.tick);

    let session = SessionController::bootstrap(api.as_ref(), auth, quiz_id, &scheduler).await?;
    println!("{}", session.quiz().title());
    if let Some(description) = session.quiz().description() {
        println!("{description}");
    }
    println!(
        "{} questions, {} total points, time left {}",
        session.quiz().question_count(),
        session.quiz().total_points(),
        format_countdown(session.remaining())
    );

    let (actions, action_rx) = mpsc::channel(32);
    let (event_tx, events) = mpsc::unbounded_channel();
    let (prompt_tx, prompts) = mpsc::channel(1);

    let console = Console::new(session.quiz().clone(), actions);
    let console = tokio::spawn(console.drive(console::spawn_stdin_reader(), events, prompts));

    let runner = AttemptRunner::new(session, Arc::clone(&api), Arc::new(ConsolePrompter::new(prompt_tx)))
        .with_events(event_tx);
    let outcome = runner.run(action_rx).await;
    console.abort();

    match outcome? {
        SessionOutcome::Submitted(attempt) => {
            info!("attempt {} finalized", attempt.id());
            match ResultsService::new(api).load(attempt.id()).await {
                Ok(review) => console::print_results(&review),
                Err(err) => {
                    warn!("{err}");
                    println!(
                        "Quiz submitted. Score: {}/{}",
                        attempt.score().unwrap_or(0),
                        attempt.total_points().unwrap_or(0)
                    );
                }
            }
        }
        SessionOutcome::Abandoned => println!("Left the quiz without submitting."),
    }
    Ok(())
}

async fn show_catalog(api: Arc<dyn QuizApi>) -> Result<(), Box<dyn std::error::Error>> {
    let quizzes = QuizCatalog::new(api).available().await?;
    if quizzes.is_empty() {
        println!("No quizzes are available right now.");
        return Ok(());
    }
    println!("Available quizzes:");
    for quiz in &quizzes {
        println!(
            "  [{}] {} ({} questions, {} min)",
            quiz.id, quiz.title, quiz.question_count, quiz.duration_minutes
        );
        if let Some(description) = &quiz.description {
            println!("      {description}");
        }
    }
    println!("Start one with --quiz-id <id>.");
    Ok(())
}

async fn show_history(api: Arc<dyn QuizApi>) -> Result<(), Box<dyn std::error::Error>> {
    let attempts = ResultsService::new(api).history().await?;
    if attempts.is_empty() {
        println!("You have not attempted any quizzes yet.");
        return Ok(());
    }
    for attempt in &attempts {
        let title = attempt.quiz_title().unwrap_or("Quiz");
        let started = attempt.started_at().format("%Y-%m-%d %H:%M");
        match (attempt.score(), attempt.total_points(), attempt.score_percent()) {
            (Some(score), Some(total), Some(percent)) => println!(
                "  #{} {title} on {started}: {score}/{total} ({percent}%)",
                attempt.id()
            ),
            _ => println!("  #{} {title} on {started}: {}", attempt.id(), attempt.status()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut argv.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn flags_are_parsed() {
        let args = parse(&["--quiz-id", "9", "--api-url", "http://quiz.local/api"]).unwrap();
        assert_eq!(args.quiz_id, Some(QuizId::new(9)));
        assert_eq!(args.api_url.unwrap().host_str(), Some("quiz.local"));
        assert_eq!(args.mode, Mode::Take);
        assert_eq!(parse(&["-h"]).unwrap().mode, Mode::Help);
        assert_eq!(parse(&["--history"]).unwrap().mode, Mode::History);
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(matches!(parse(&["--quiz-id"]), Err(ArgsError::MissingValue { .. })));
        assert!(matches!(parse(&["--quiz-id", "x"]), Err(ArgsError::InvalidQuizId { .. })));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
    }
}
