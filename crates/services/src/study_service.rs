use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::Serialize;

use cards_core::model::{Card, CardId, CardTypeId};
use storage::repository::{CardRepository, StorageError};

use crate::error::StudyError;

/// Known/unknown counts for one card type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeProgress {
    pub name: String,
    pub known: u32,
    pub unknown: u32,
}

/// Memorize flow: draw unknown cards, mark them known, start over.
#[derive(Clone)]
pub struct StudyService {
    cards: Arc<dyn CardRepository>,
}

impl StudyService {
    #[must_use]
    pub fn new(cards: Arc<dyn CardRepository>) -> Self {
        Self { cards }
    }

    /// A random card of the type that is not yet known, or `None` once every card is.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::CardTypeNotFound` for an unknown type.
    pub async fn next_unknown_card(&self, type_name: &str) -> Result<Option<Card>, StudyError> {
        self.require_type(type_name).await?;
        let unknown: Vec<Card> = self
            .cards
            .list_cards_by_type(type_name)
            .await?
            .into_iter()
            .filter(|c| !c.is_known())
            .collect();
        Ok(unknown.choose(&mut rand::rng()).cloned())
    }

    /// # Errors
    ///
    /// Returns `StudyError::CardNotFound` if the card does not exist.
    pub async fn mark_known(&self, card_id: CardId) -> Result<(), StudyError> {
        self.cards
            .set_known(card_id, true)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => StudyError::CardNotFound(card_id),
                other => StudyError::Storage(other),
            })?;
        tracing::debug!(card_id = %card_id, "card marked known");
        Ok(())
    }

    /// Reset the known flag on every card of the type; returns how many cards were reset.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::CardTypeNotFound` for an unknown type.
    pub async fn clear_known(&self, type_name: &str) -> Result<u64, StudyError> {
        let type_id = self.require_type(type_name).await?;
        let cleared = self.cards.clear_known(type_id).await?;
        tracing::info!(card_type = type_name, cleared, "cleared known cards");
        Ok(cleared)
    }

    /// Progress for every card type, ordered by type id.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Storage` if storage fails.
    pub async fn type_progress(&self) -> Result<Vec<TypeProgress>, StudyError> {
        let mut out = Vec::new();
        for card_type in self.cards.list_card_types().await? {
            let cards = self.cards.list_cards_by_type(card_type.name()).await?;
            let known = cards.iter().filter(|c| c.is_known()).count();
            let unknown = cards.len() - known;
            out.push(TypeProgress {
                name: card_type.name().to_owned(),
                known: u32::try_from(known).unwrap_or(u32::MAX),
                unknown: u32::try_from(unknown).unwrap_or(u32::MAX),
            });
        }
        Ok(out)
    }

    async fn require_type(&self, type_name: &str) -> Result<CardTypeId, StudyError> {
        self.cards
            .find_card_type(type_name)
            .await?
            .map(|t| t.id())
            .ok_or_else(|| StudyError::CardTypeNotFound(type_name.to_owned()))
    }
}
