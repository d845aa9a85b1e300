use cards_core::model::{
    ChoiceAnswer, ChoiceQuestion, ChoiceQuiz, ChoiceQuizDraft, QuizId, ResultSummary,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    card_id_from_i64, card_type_id_from_i64, db_err, id_i64, option_id_from_i64,
    quiz_id_from_i64, ser,
};
use super::result_repo::insert_result;
use crate::repository::{ChoiceQuizRepository, StorageError};

#[async_trait::async_trait]
impl ChoiceQuizRepository for SqliteRepository {
    async fn create_choice_quiz(
        &self,
        draft: &ChoiceQuizDraft,
    ) -> Result<ChoiceQuiz, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query("INSERT INTO choice_quizzes (card_type_id, created_at) VALUES (?1, ?2)")
            .bind(id_i64("card_type_id", draft.card_type_id().value())?)
            .bind(draft.created_at())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let quiz_id = quiz_id_from_i64(res.last_insert_rowid())?;

        for (position, question) in (0_i64..).zip(draft.questions()) {
            let res = sqlx::query(
                r"
                INSERT INTO choice_quiz_cards (quiz_id, card_id, position)
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

            for (option_position, option_id) in (0_i64..).zip(&question.option_order) {
                sqlx::query(
                    r"
                    INSERT INTO choice_quiz_option_order (question_id, option_id, position)
                    VALUES (?1, ?2, ?3)
                    ",
                )
                .bind(question_id)
                .bind(id_i64("option_id", option_id.value())?)
                .bind(option_position)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(quiz_id = %quiz_id, questions = draft.questions().len(), "stored choice quiz");
        Ok(draft.clone().assign_id(quiz_id))
    }

    async fn get_choice_quiz(&self, id: QuizId) -> Result<Option<ChoiceQuiz>, StorageError> {
        let quiz_id = id_i64("quiz_id", id.value())?;

        let Some(quiz_row) =
            sqlx::query("SELECT id, card_type_id, created_at FROM choice_quizzes WHERE id = ?1")
                .bind(quiz_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r"
            SELECT qc.card_id, qo.option_id
            FROM choice_quiz_cards qc
            LEFT JOIN choice_quiz_option_order qo ON qo.question_id = qc.id
            WHERE qc.quiz_id = ?1
            ORDER BY qc.position ASC, qo.position ASC
            ",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut questions: Vec<ChoiceQuestion> = Vec::new();
        for row in &rows {
            let card_id = card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?;
            let option_id = row
                .try_get::<Option<i64>, _>("option_id")
                .map_err(ser)?
                .map(option_id_from_i64)
                .transpose()?;

            if questions.last().is_none_or(|q| q.card_id != card_id) {
                questions.push(ChoiceQuestion {
                    card_id,
                    option_order: Vec::new(),
                });
            }
            if let Some(question) = questions.last_mut() {
                question.option_order.extend(option_id);
            }
        }

        Ok(Some(ChoiceQuiz {
            id: quiz_id_from_i64(quiz_row.try_get::<i64, _>("id").map_err(ser)?)?,
            card_type_id: card_type_id_from_i64(
                quiz_row.try_get::<i64, _>("card_type_id").map_err(ser)?,
            )?,
            created_at: quiz_row.try_get("created_at").map_err(ser)?,
            questions,
        }))
    }

    async fn record_choice_submission(
        &self,
        answers: &[ChoiceAnswer],
        result: &ResultSummary,
    ) -> Result<(), StorageError> {
        let quiz_id = id_i64("quiz_id", result.quiz_id().value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists = sqlx::query("SELECT 1 FROM choice_quizzes WHERE id = ?1")
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
                INSERT INTO choice_answers (quiz_id, card_id, selected_option_id, correct_option_id)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(quiz_id)
            .bind(id_i64("card_id", answer.card_id.value())?)
            .bind(id_i64("option_id", answer.selected.value())?)
            .bind(id_i64("option_id", answer.correct.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn choice_answers(&self, id: QuizId) -> Result<Vec<ChoiceAnswer>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT quiz_id, card_id, selected_option_id, correct_option_id
            FROM choice_answers
            WHERE quiz_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                Ok(ChoiceAnswer {
                    quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
                    card_id: card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?,
                    selected: option_id_from_i64(
                        row.try_get::<i64, _>("selected_option_id").map_err(ser)?,
                    )?,
                    correct: option_id_from_i64(
                        row.try_get::<i64, _>("correct_option_id").map_err(ser)?,
                    )?,
                })
            })
            .collect()
    }
}
