use std::fmt;

use cards_core::model::{ItemId, OptionId};
use serde::Serialize;
use serde_json::json;
use services::{AppServices, AppServicesError, Clock, QuizError, StudyError};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Args, ArgsError, Command, Env, QuizCommand, StudyCommand, print_usage};

const DEFAULT_LOG_FILTER: &str = "app=info,services=info,storage=info";

/// Everything that ends the process with a non-zero status.
#[derive(Debug)]
enum CliError {
    Args(ArgsError),
    Unauthorized,
    Startup(AppServicesError),
    Quiz(QuizError),
    Study(StudyError),
    Io(std::io::Error),
    Output(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Args(e) => write!(f, "{e}"),
            CliError::Unauthorized => write!(f, "invalid username or password"),
            CliError::Startup(e) => write!(f, "failed to open storage: {e}"),
            CliError::Quiz(e) => write!(f, "{e}"),
            CliError::Study(e) => write!(f, "{e}"),
            CliError::Io(e) => write!(f, "{e}"),
            CliError::Output(e) => write!(f, "failed to render output: {e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<QuizError> for CliError {
    fn from(e: QuizError) -> Self {
        CliError::Quiz(e)
    }
}

impl From<StudyError> for CliError {
    fn from(e: StudyError) -> Self {
        CliError::Study(e)
    }
}

impl CliError {
    /// 1 storage/internal, 2 usage, 3 unauthorized, 4 not found, 5 missing answer,
    /// 6 data integrity, 7 already submitted.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Args(_) => 2,
            CliError::Unauthorized => 3,
            CliError::Quiz(e) if e.is_not_found() => 4,
            CliError::Quiz(QuizError::MissingAnswer { .. }) => 5,
            CliError::Quiz(QuizError::DataIntegrity(_)) => 6,
            CliError::Quiz(QuizError::AlreadySubmitted(_)) => 7,
            CliError::Study(StudyError::CardTypeNotFound(_) | StudyError::CardNotFound(_)) => 4,
            _ => 1,
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::Output)?;
    println!("{rendered}");
    Ok(())
}

async fn run_choice(
    services: &AppServices,
    command: QuizCommand<OptionId>,
) -> Result<(), CliError> {
    let engine = services.choice_quizzes();
    match command {
        QuizCommand::New { type_name } => {
            let quiz_id = engine.create_quiz(&type_name).await?;
            emit(&json!({ "quiz_id": quiz_id }))
        }
        QuizCommand::Show { quiz_id } => emit(&engine.get_quiz(quiz_id).await?),
        QuizCommand::Submit { quiz_id, answers } => {
            let score = engine.submit_answers(quiz_id, &answers).await?;
            emit(&json!({ "quiz_id": quiz_id, "score": score }))
        }
        QuizCommand::Result { quiz_id } => emit(&engine.get_result(quiz_id).await?),
    }
}

async fn run_ordered(
    services: &AppServices,
    command: QuizCommand<Vec<ItemId>>,
) -> Result<(), CliError> {
    let engine = services.ordered_quizzes();
    match command {
        QuizCommand::New { type_name } => {
            let quiz_id = engine.create_quiz(&type_name).await?;
            emit(&json!({ "quiz_id": quiz_id }))
        }
        QuizCommand::Show { quiz_id } => emit(&engine.get_quiz(quiz_id).await?),
        QuizCommand::Submit { quiz_id, answers } => {
            let score = engine.submit_answers(quiz_id, &answers).await?;
            emit(&json!({ "quiz_id": quiz_id, "score": score }))
        }
        QuizCommand::Result { quiz_id } => emit(&engine.get_result(quiz_id).await?),
    }
}

async fn run_study(services: &AppServices, command: StudyCommand) -> Result<(), CliError> {
    let study = services.study();
    match command {
        StudyCommand::Next { type_name } => {
            let card = study.next_unknown_card(&type_name).await?;
            emit(&json!({ "card_type": type_name, "card": card }))
        }
        StudyCommand::Known { card_id } => {
            study.mark_known(card_id).await?;
            emit(&json!({ "card_id": card_id, "known": true }))
        }
        StudyCommand::Reset { type_name } => {
            let cleared = study.clear_known(&type_name).await?;
            emit(&json!({ "card_type": type_name, "cleared": cleared }))
        }
        StudyCommand::Progress => emit(&study.type_progress().await?),
    }
}

async fn run() -> Result<(), CliError> {
    let args = Args::parse_from(std::env::args().skip(1), &Env::from_process()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        CliError::Args(e)
    })?;

    if args.command == Command::Help {
        print_usage();
        return Ok(());
    }

    // Authorization stays in the binary; services never see credentials.
    if !args.is_authorized() {
        tracing::warn!("rejected credentials");
        return Err(CliError::Unauthorized);
    }

    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.db_url, Clock::system())
        .await
        .map_err(CliError::Startup)?;
    tracing::debug!(db = %args.db_url, "storage ready");

    match args.command {
        Command::Choice(command) => run_choice(&services, command).await,
        Command::Ordered(command) => run_ordered(&services, command).await,
        Command::Study(command) => run_study(&services, command).await,
        Command::Help => Ok(()),
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), CliError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let invalid = || {
        CliError::Args(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(CliError::Io)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(CliError::Io)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(err.exit_code());
    }
}
