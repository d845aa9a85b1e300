use std::fmt;

use storage::repository::{NewCardRecord, NewItemRecord, NewOptionRecord, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    only: Option<String>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    UnknownType { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::UnknownType { raw } => write!(f, "no sample set named {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("CARDS_DB_URL")
            .unwrap_or_else(|_| "sqlite://cards.sqlite3?mode=rwc".into());
        let mut only = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--only" => {
                    let value = require_value(&mut args, "--only")?;
                    if !SAMPLE_SETS.iter().any(|set| set.type_name == value) {
                        return Err(ArgsError::UnknownType { raw: value });
                    }
                    only = Some(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, only })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://cards.sqlite3?mode=rwc)");
    eprintln!("  --only <type>             Seed a single sample set (geography, code, writing)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  CARDS_DB_URL");
}

/// Sample card content. `choices` lists (text, is_correct); `items` is the canonical order.
struct SampleCard {
    front: &'static str,
    back: &'static str,
    choices: &'static [(&'static str, bool)],
    items: &'static [&'static str],
}

struct SampleSet {
    type_name: &'static str,
    cards: &'static [SampleCard],
}

const SAMPLE_SETS: &[SampleSet] = &[
    SampleSet {
        type_name: "geography",
        cards: &[
            SampleCard {
                front: "Capital of France?",
                back: "Paris",
                choices: &[("Paris", true), ("Lyon", false), ("Marseille", false)],
                items: &[],
            },
            SampleCard {
                front: "Capital of Japan?",
                back: "Tokyo",
                choices: &[("Osaka", false), ("Tokyo", true), ("Kyoto", false)],
                items: &[],
            },
            SampleCard {
                front: "Capital of Canada?",
                back: "Ottawa",
                choices: &[("Toronto", false), ("Vancouver", false), ("Ottawa", true)],
                items: &[],
            },
            SampleCard {
                front: "Capital of Australia?",
                back: "Canberra",
                choices: &[("Sydney", false), ("Canberra", true), ("Melbourne", false)],
                items: &[],
            },
            SampleCard {
                front: "Capital of Brazil?",
                back: "Brasilia",
                choices: &[("Brasilia", true), ("Rio de Janeiro", false), ("Sao Paulo", false)],
                items: &[],
            },
        ],
    },
    SampleSet {
        type_name: "code",
        cards: &[
            SampleCard {
                front: "Which keyword declares an immutable binding in Rust?",
                back: "let",
                choices: &[("let", true), ("var", false), ("const mut", false)],
                items: &[],
            },
            SampleCard {
                front: "Which trait enables the ? operator conversion of errors?",
                back: "From",
                choices: &[("Into", false), ("From", true), ("AsRef", false)],
                items: &[],
            },
            SampleCard {
                front: "Which smart pointer gives shared ownership across threads?",
                back: "Arc",
                choices: &[("Rc", false), ("Box", false), ("Arc", true)],
                items: &[],
            },
        ],
    },
    SampleSet {
        type_name: "writing",
        cards: &[
            SampleCard {
                front: "Order the parts of an essay",
                back: "intro, body, end",
                choices: &[],
                items: &["intro", "body", "end"],
            },
            SampleCard {
                front: "Order the steps of a git change",
                back: "edit, add, commit, push",
                choices: &[],
                items: &["edit", "add", "commit", "push"],
            },
            SampleCard {
                front: "Order the stages of a compiler",
                back: "lex, parse, check, emit",
                choices: &[],
                items: &["lex", "parse", "check", "emit"],
            },
        ],
    },
];

async fn seed_set(storage: &Storage, set: &SampleSet) -> Result<bool, Box<dyn std::error::Error>> {
    if storage.cards.find_card_type(set.type_name).await?.is_some() {
        return Ok(false);
    }

    let card_type = storage.cards.insert_card_type(set.type_name).await?;
    for sample in set.cards {
        let card = storage
            .cards
            .insert_card(NewCardRecord {
                type_id: card_type.id(),
                front: sample.front.to_owned(),
                back: sample.back.to_owned(),
            })
            .await?;

        for (text, is_correct) in sample.choices {
            storage
                .cards
                .insert_option(NewOptionRecord {
                    card_id: card.id(),
                    text: (*text).to_owned(),
                    is_correct: *is_correct,
                })
                .await?;
        }

        for (position, text) in (0_u32..).zip(sample.items) {
            storage
                .cards
                .insert_ordered_item(NewItemRecord {
                    card_id: card.id(),
                    text: (*text).to_owned(),
                    position,
                })
                .await?;
        }
    }
    Ok(true)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    for set in SAMPLE_SETS
        .iter()
        .filter(|set| args.only.as_deref().is_none_or(|only| only == set.type_name))
    {
        if seed_set(&storage, set).await? {
            println!(
                "Seeded card type {} with {} cards into {}",
                set.type_name,
                set.cards.len(),
                args.db_url
            );
        } else {
            println!("Card type {} already present, skipped", set.type_name);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
