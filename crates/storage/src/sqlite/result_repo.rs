use cards_core::model::{QuizId, QuizKind, ResultSummary};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_result_row};
use crate::repository::{ResultRepository, StorageError};

/// Insert a result row on an open connection, usually inside the submission
/// transaction. Fails with `Conflict` if the quiz already has a result.
pub(crate) async fn insert_result(
    conn: &mut SqliteConnection,
    result: &ResultSummary,
) -> Result<(), StorageError> {
    let quiz_id = id_i64("quiz_id", result.quiz_id().value())?;

    let existing = sqlx::query("SELECT 1 FROM quiz_results WHERE quiz_kind = ?1 AND quiz_id = ?2")
        .bind(result.kind().as_str())
        .bind(quiz_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;
    if existing.is_some() {
        return Err(StorageError::Conflict);
    }

    let score = result.score();
    sqlx::query(
        r"
        INSERT INTO quiz_results (
            quiz_kind, quiz_id, total_correct, total_incorrect, percentage, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )
    .bind(result.kind().as_str())
    .bind(quiz_id)
    .bind(i64::from(score.correct))
    .bind(i64::from(score.incorrect))
    .bind(score.percentage)
    .bind(result.created_at())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn get_result(
        &self,
        kind: QuizKind,
        quiz_id: QuizId,
    ) -> Result<Option<ResultSummary>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT quiz_kind, quiz_id, total_correct, total_incorrect, percentage, created_at
            FROM quiz_results
            WHERE quiz_kind = ?1 AND quiz_id = ?2
            ",
        )
        .bind(kind.as_str())
        .bind(id_i64("quiz_id", quiz_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_result_row).transpose()
    }
}
