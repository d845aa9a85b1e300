use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS card_types (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            type_id INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            known INTEGER NOT NULL DEFAULT 0 CHECK (known IN (0, 1)),
            FOREIGN KEY (type_id) REFERENCES card_types(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS card_choices (
            id INTEGER PRIMARY KEY,
            card_id INTEGER NOT NULL,
            choice TEXT NOT NULL,
            is_correct INTEGER NOT NULL DEFAULT 0 CHECK (is_correct IN (0, 1)),
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS card_ordered_items (
            id INTEGER PRIMARY KEY,
            card_id INTEGER NOT NULL,
            item TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            UNIQUE (card_id, position),
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS choice_quizzes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_type_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (card_type_id) REFERENCES card_types(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS choice_quiz_cards (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            UNIQUE (quiz_id, card_id),
            UNIQUE (quiz_id, position),
            FOREIGN KEY (quiz_id) REFERENCES choice_quizzes(id) ON DELETE CASCADE,
            FOREIGN KEY (card_id) REFERENCES cards(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS choice_quiz_option_order (
            question_id INTEGER NOT NULL,
            option_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            PRIMARY KEY (question_id, position),
            UNIQUE (question_id, option_id),
            FOREIGN KEY (question_id) REFERENCES choice_quiz_cards(id) ON DELETE CASCADE,
            FOREIGN KEY (option_id) REFERENCES card_choices(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS choice_answers (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL,
            selected_option_id INTEGER NOT NULL,
            correct_option_id INTEGER NOT NULL,
            FOREIGN KEY (quiz_id) REFERENCES choice_quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS ordered_quizzes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_type_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (card_type_id) REFERENCES card_types(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS ordered_quiz_cards (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            UNIQUE (quiz_id, card_id),
            UNIQUE (quiz_id, position),
            FOREIGN KEY (quiz_id) REFERENCES ordered_quizzes(id) ON DELETE CASCADE,
            FOREIGN KEY (card_id) REFERENCES cards(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS ordered_quiz_item_order (
            question_id INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            PRIMARY KEY (question_id, position),
            UNIQUE (question_id, item_id),
            FOREIGN KEY (question_id) REFERENCES ordered_quiz_cards(id) ON DELETE CASCADE,
            FOREIGN KEY (item_id) REFERENCES card_ordered_items(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS ordered_answers (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            FOREIGN KEY (quiz_id) REFERENCES ordered_quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_results (
            id INTEGER PRIMARY KEY,
            quiz_kind TEXT NOT NULL CHECK (quiz_kind IN ('multiple_choice', 'ordered')),
            quiz_id INTEGER NOT NULL,
            total_correct INTEGER NOT NULL CHECK (total_correct >= 0),
            total_incorrect INTEGER NOT NULL CHECK (total_incorrect >= 0),
            percentage REAL NOT NULL CHECK (percentage BETWEEN 0 AND 100),
            created_at TEXT NOT NULL,
            UNIQUE (quiz_kind, quiz_id)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_cards_type
            ON cards(type_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_card_choices_card
            ON card_choices(card_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_choice_answers_quiz
            ON choice_answers(quiz_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_ordered_answers_quiz
            ON ordered_answers(quiz_id, card_id, position);
    ",
];

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the card repository tables, both quiz modes, and the result store.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
