//! Shared error types for the services crate.

use thiserror::Error;

use cards_core::model::{CardId, ItemId, OptionId, QuizDraftError, QuizId};
use cards_core::scoring::ScoringError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the quiz engines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("card type not found: {0}")]
    CardTypeNotFound(String),
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error("no result recorded for quiz {0}")]
    ResultNotFound(QuizId),
    #[error("card {0} not found")]
    CardNotFound(CardId),
    #[error("card {0} is not part of this quiz")]
    CardNotInQuiz(CardId),
    #[error("option {option_id} does not belong to card {card_id}")]
    OptionNotFound { card_id: CardId, option_id: OptionId },
    #[error("item {item_id} does not belong to card {card_id}")]
    ItemNotFound { card_id: CardId, item_id: ItemId },
    #[error("no answer submitted for card {card_id}")]
    MissingAnswer { card_id: CardId },
    #[error("data integrity: {0}")]
    DataIntegrity(ScoringError),
    #[error("quiz {0} was already submitted")]
    AlreadySubmitted(QuizId),
    #[error(transparent)]
    Draft(#[from] QuizDraftError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    /// True for every "does not exist" flavour: type, quiz, result, card, option or item.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QuizError::CardTypeNotFound(_)
                | QuizError::QuizNotFound(_)
                | QuizError::ResultNotFound(_)
                | QuizError::CardNotFound(_)
                | QuizError::CardNotInQuiz(_)
                | QuizError::OptionNotFound { .. }
                | QuizError::ItemNotFound { .. }
        )
    }
}

impl From<ScoringError> for QuizError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::MissingAnswer { card_id } => QuizError::MissingAnswer { card_id },
            ScoringError::UnknownCard { card_id } => QuizError::CardNotInQuiz(card_id),
            ScoringError::UnknownOption { card_id, option_id } => {
                QuizError::OptionNotFound { card_id, option_id }
            }
            ScoringError::UnknownItem { card_id, item_id } => {
                QuizError::ItemNotFound { card_id, item_id }
            }
            other => QuizError::DataIntegrity(other),
        }
    }
}

/// Errors emitted by `StudyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error("card type not found: {0}")]
    CardTypeNotFound(String),
    #[error("card {0} not found")]
    CardNotFound(CardId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_errors_split_into_submission_and_integrity_kinds() {
        let card_id = CardId::new(3);
        assert!(matches!(
            QuizError::from(ScoringError::MissingAnswer { card_id }),
            QuizError::MissingAnswer { .. }
        ));
        assert!(QuizError::from(ScoringError::UnknownCard { card_id }).is_not_found());
        assert!(
            QuizError::from(ScoringError::UnknownItem {
                card_id,
                item_id: ItemId::new(9),
            })
            .is_not_found()
        );
        assert!(matches!(
            QuizError::from(ScoringError::MultipleCorrectOptions { card_id, count: 2 }),
            QuizError::DataIntegrity(_)
        ));
        assert!(!QuizError::AlreadySubmitted(QuizId::new(1)).is_not_found());
    }
}
