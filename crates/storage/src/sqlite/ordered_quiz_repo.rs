use cards_core::model::{
    OrderedAnswer, OrderedQuestion, OrderedQuiz, OrderedQuizDraft, QuizId, ResultSummary,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    card_id_from_i64, card_type_id_from_i64, db_err, id_i64, item_id_from_i64, quiz_id_from_i64,
    ser, u32_from_i64,
};
use super::result_repo::insert_result;
use crate::repository::{OrderedQuizRepository, StorageError};

#[async_trait::async_trait]
impl OrderedQuizRepository for SqliteRepository {
    async fn create_ordered_quiz(
        &self,
        draft: &OrderedQuizDraft,
    ) -> Result<OrderedQuiz, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res =
            sqlx::query("INSERT INTO ordered_quizzes (card_type_id, created_at) VALUES (?1, ?2)")
                .bind(id_i64("card_type_id", draft.card_type_id().value())?)
                .bind(draft.created_at())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        let quiz_id = quiz_id_from_i64(res.last_insert_rowid())?;

        for (position, question) in (0_i64..).zip(draft.questions()) {
            let res = sqlx::query(
                r"
                INSERT INTO ordered_quiz_cards (quiz_id, card_id, position)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(id_i64("quiz_id", quiz_id.value())?)
            .bind(id_i64("card_id", question.card_id.value())?)
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            let question_id = res.last_insert_rowid();

            for (item_position, item_id) in (0_i64..).zip(&question.item_order) {
                sqlx::query(
                    r"
                    INSERT INTO ordered_quiz_item_order (question_id, item_id, position)
                    VALUES (?1, ?2, ?3)
                    ",
                )
                .bind(question_id)
                .bind(id_i64("item_id", item_id.value())?)
                .bind(item_position)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(quiz_id = %quiz_id, questions = draft.questions().len(), "stored ordered quiz");
        Ok(draft.clone().assign_id(quiz_id))
    }

    async fn get_ordered_quiz(&self, id: QuizId) -> Result<Option<OrderedQuiz>, StorageError> {
        let quiz_id = id_i64("quiz_id", id.value())?;

        let Some(quiz_row) =
            sqlx::query("SELECT id, card_type_id, created_at FROM ordered_quizzes WHERE id = ?1")
                .bind(quiz_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r"
            SELECT qc.card_id, qi.item_id
            FROM ordered_quiz_cards qc
            LEFT JOIN ordered_quiz_item_order qi ON qi.question_id = qc.id
            WHERE qc.quiz_id = ?1
            ORDER BY qc.position ASC, qi.position ASC
            ",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut questions: Vec<OrderedQuestion> = Vec::new();
        for row in &rows {
            let card_id = card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?;
            let item_id = row
                .try_get::<Option<i64>, _>("item_id")
                .map_err(ser)?
                .map(item_id_from_i64)
                .transpose()?;

            if questions.last().is_none_or(|q| q.card_id != card_id) {
                questions.push(OrderedQuestion {
                    card_id,
                    item_order: Vec::new(),
                });
            }
            if let Some(question) = questions.last_mut() {
                question.item_order.extend(item_id);
            }
        }

        Ok(Some(OrderedQuiz {
            id: quiz_id_from_i64(quiz_row.try_get::<i64, _>("id").map_err(ser)?)?,
            card_type_id: card_type_id_from_i64(
                quiz_row.try_get::<i64, _>("card_type_id").map_err(ser)?,
            )?,
            created_at: quiz_row.try_get("created_at").map_err(ser)?,
            questions,
        }))
    }

    async fn record_ordered_submission(
        &self,
        answers: &[OrderedAnswer],
        result: &ResultSummary,
    ) -> Result<(), StorageError> {
        let quiz_id = id_i64("quiz_id", result.quiz_id().value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists = sqlx::query("SELECT 1 FROM ordered_quizzes WHERE id = ?1")
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        insert_result(&mut *tx, result).await?;

        for answer in answers {
            sqlx::query(
                r"
                INSERT INTO ordered_answers (quiz_id, card_id, item_id, position)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(quiz_id)
            .bind(id_i64("card_id", answer.card_id.value())?)
            .bind(id_i64("item_id", answer.item_id.value())?)
            .bind(i64::from(answer.position))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn ordered_answers(&self, id: QuizId) -> Result<Vec<OrderedAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT quiz_id, card_id, item_id, position
            FROM ordered_answers
            WHERE quiz_id = ?1
            ORDER BY card_id ASC, position ASC
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok(OrderedAnswer {
                    quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
                    card_id: card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?,
                    item_id: item_id_from_i64(row.try_get::<i64, _>("item_id").map_err(ser)?)?,
                    position: u32_from_i64(
                        "position",
                        row.try_get::<i64, _>("position").map_err(ser)?,
                    )?,
                })
            })
            .collect()
    }
}
