use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use cards_core::model::{CardId, ItemId, OptionId, QuizId};

pub const DEFAULT_DB_URL: &str = "sqlite://cards.sqlite3";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "default";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingCommand,
    UnknownCommand(String),
    MissingOperand { what: &'static str },
    UnexpectedOperand(String),
    InvalidDbUrl { raw: String },
    InvalidId { what: &'static str, raw: String },
    InvalidAnswer { raw: String },
    DuplicateAnswer(CardId),
    InvalidAuth,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingOperand { what } => write!(f, "missing {what}"),
            ArgsError::UnexpectedOperand(arg) => write!(f, "unexpected argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidId { what, raw } => write!(f, "invalid {what}: {raw}"),
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid answer (expected <card>=<id>[,<id>...]): {raw}")
            }
            ArgsError::DuplicateAnswer(card_id) => {
                write!(f, "card {card_id} answered more than once")
            }
            ArgsError::InvalidAuth => write!(f, "CARDS_AUTH must look like user:password"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// A username/password pair, either expected by the gate or supplied by the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Parse the `user:password` form used by `CARDS_AUTH`.
    fn from_pair(raw: &str) -> Result<Self, ArgsError> {
        let (username, password) = raw.split_once(':').ok_or(ArgsError::InvalidAuth)?;
        if username.is_empty() {
            return Err(ArgsError::InvalidAuth);
        }
        Ok(Self {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }
}

/// Environment-sourced settings. Flags override them.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub db_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth: Option<String>,
}

impl Env {
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            db_url: std::env::var("CARDS_DB_URL").ok(),
            username: std::env::var("CARDS_USERNAME").ok(),
            password: std::env::var("CARDS_PASSWORD").ok(),
            auth: std::env::var("CARDS_AUTH").ok(),
        }
    }

    fn expected_credentials(&self) -> Credentials {
        Credentials {
            username: self
                .username
                .clone()
                .unwrap_or_else(|| DEFAULT_USERNAME.into()),
            password: self
                .password
                .clone()
                .unwrap_or_else(|| DEFAULT_PASSWORD.into()),
        }
    }
}

/// The four operations of a quiz engine; `A` is the per-card answer shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand<A> {
    New { type_name: String },
    Show { quiz_id: QuizId },
    Submit {
        quiz_id: QuizId,
        answers: HashMap<CardId, A>,
    },
    Result { quiz_id: QuizId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyCommand {
    Next { type_name: String },
    Known { card_id: CardId },
    Reset { type_name: String },
    Progress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Choice(QuizCommand<OptionId>),
    Ordered(QuizCommand<Vec<ItemId>>),
    Study(StudyCommand),
    Help,
}

#[derive(Debug)]
pub struct Args {
    pub db_url: String,
    pub expected: Credentials,
    pub supplied: Option<Credentials>,
    pub command: Command,
}

impl Args {
    /// Parse process arguments (without the program name) on top of `env`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for malformed flags, commands or operands.
    pub fn parse_from(
        argv: impl IntoIterator<Item = String>,
        env: &Env,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env
            .db_url
            .clone()
            .map_or_else(|| DEFAULT_DB_URL.to_owned(), normalize_sqlite_url);
        let mut user = None;
        let mut password = None;

        let mut args = argv.into_iter();
        let mut rest = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = Some(require_value(&mut args, "--user")?),
                "--password" => password = Some(require_value(&mut args, "--password")?),
                "--help" | "-h" => {
                    return Ok(Self {
                        db_url,
                        expected: env.expected_credentials(),
                        supplied: None,
                        command: Command::Help,
                    });
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => {
                    rest.push(arg);
                    rest.extend(args.by_ref());
                }
            }
        }

        let supplied = match (user, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (Some(_), None) => return Err(ArgsError::MissingValue { flag: "--password" }),
            (None, Some(_)) => return Err(ArgsError::MissingValue { flag: "--user" }),
            (None, None) => env
                .auth
                .as_deref()
                .map(Credentials::from_pair)
                .transpose()?,
        };

        Ok(Self {
            db_url,
            expected: env.expected_credentials(),
            supplied,
            command: parse_command(rest)?,
        })
    }

    /// The shared-credential gate.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.supplied.as_ref() == Some(&self.expected)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_command(words: Vec<String>) -> Result<Command, ArgsError> {
    let mut words = words.into_iter();
    let group = words.next().ok_or(ArgsError::MissingCommand)?;
    let action = words.next();
    let rest: Vec<String> = words.collect();

    match group.as_str() {
        "choice" => Ok(Command::Choice(parse_quiz_command(
            action,
            rest,
            parse_choice_answer,
        )?)),
        "ordered" => Ok(Command::Ordered(parse_quiz_command(
            action,
            rest,
            parse_ordered_answer,
        )?)),
        "study" => parse_study_command(action, rest).map(Command::Study),
        "help" => Ok(Command::Help),
        _ => Err(ArgsError::UnknownCommand(group)),
    }
}

fn parse_quiz_command<A>(
    action: Option<String>,
    rest: Vec<String>,
    parse_answer: fn(&str) -> Result<(CardId, A), ArgsError>,
) -> Result<QuizCommand<A>, ArgsError> {
    let action = action.ok_or(ArgsError::MissingOperand { what: "quiz action" })?;
    let mut rest = rest.into_iter();
    let command = match action.as_str() {
        "new" => QuizCommand::New {
            type_name: rest
                .next()
                .ok_or(ArgsError::MissingOperand { what: "card type" })?,
        },
        "show" => QuizCommand::Show {
            quiz_id: parse_id(rest.next(), "quiz id")?,
        },
        "result" => QuizCommand::Result {
            quiz_id: parse_id(rest.next(), "quiz id")?,
        },
        "submit" => {
            let quiz_id = parse_id(rest.next(), "quiz id")?;
            let mut answers = HashMap::new();
            for raw in rest.by_ref() {
                let (card_id, answer) = parse_answer(&raw)?;
                if answers.insert(card_id, answer).is_some() {
                    return Err(ArgsError::DuplicateAnswer(card_id));
                }
            }
            QuizCommand::Submit { quiz_id, answers }
        }
        _ => return Err(ArgsError::UnknownCommand(action)),
    };
    reject_extra(rest)?;
    Ok(command)
}

fn parse_study_command(
    action: Option<String>,
    rest: Vec<String>,
) -> Result<StudyCommand, ArgsError> {
    let action = action.ok_or(ArgsError::MissingOperand {
        what: "study action",
    })?;
    let mut rest = rest.into_iter();
    let command = match action.as_str() {
        "next" => StudyCommand::Next {
            type_name: rest
                .next()
                .ok_or(ArgsError::MissingOperand { what: "card type" })?,
        },
        "known" => StudyCommand::Known {
            card_id: parse_id(rest.next(), "card id")?,
        },
        "reset" => StudyCommand::Reset {
            type_name: rest
                .next()
                .ok_or(ArgsError::MissingOperand { what: "card type" })?,
        },
        "progress" => StudyCommand::Progress,
        _ => return Err(ArgsError::UnknownCommand(action)),
    };
    reject_extra(rest)?;
    Ok(command)
}

fn reject_extra(mut rest: impl Iterator<Item = String>) -> Result<(), ArgsError> {
    match rest.next() {
        Some(extra) => Err(ArgsError::UnexpectedOperand(extra)),
        None => Ok(()),
    }
}

fn parse_id<T: FromStr>(raw: Option<String>, what: &'static str) -> Result<T, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingOperand { what })?;
    raw.parse().map_err(|_| ArgsError::InvalidId { what, raw })
}

/// `<card>=<option>`
fn parse_choice_answer(raw: &str) -> Result<(CardId, OptionId), ArgsError> {
    let invalid = || ArgsError::InvalidAnswer { raw: raw.to_owned() };
    let (card, option) = raw.split_once('=').ok_or_else(invalid)?;
    Ok((
        card.parse().map_err(|_| invalid())?,
        option.parse().map_err(|_| invalid())?,
    ))
}

/// `<card>=<item>,<item>,...`; an empty list after `=` is a valid (empty) sequence.
fn parse_ordered_answer(raw: &str) -> Result<(CardId, Vec<ItemId>), ArgsError> {
    let invalid = || ArgsError::InvalidAnswer { raw: raw.to_owned() };
    let (card, items) = raw.split_once('=').ok_or_else(invalid)?;
    let card_id = card.parse().map_err(|_| invalid())?;
    if items.trim().is_empty() {
        return Ok((card_id, Vec::new()));
    }
    let items = items
        .split(',')
        .map(|item| item.parse().map_err(|_| invalid()))
        .collect::<Result<Vec<ItemId>, _>>()?;
    Ok((card_id, items))
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  choice  new <type> | show <quiz> | submit <quiz> <card>=<option>... | result <quiz>");
    eprintln!("  ordered new <type> | show <quiz> | submit <quiz> <card>=<item>,<item>... | result <quiz>");
    eprintln!("  study   next <type> | known <card> | reset <type> | progress");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --user <name>             Username for the credential check");
    eprintln!("  --password <pw>           Password for the credential check");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CARDS_DB_URL, CARDS_USERNAME, CARDS_PASSWORD, CARDS_AUTH=user:password, RUST_LOG");
}
