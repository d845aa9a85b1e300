use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CardId, CardTypeId, ItemId, OptionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card type name cannot be empty")]
    EmptyTypeName,

    #[error("card front cannot be empty")]
    EmptyFront,

    #[error("option text cannot be empty")]
    EmptyChoice,

    #[error("ordered item text cannot be empty")]
    EmptyItem,
}

//
// ─── CARD TYPE ─────────────────────────────────────────────────────────────────
//

/// Named category grouping cards (e.g. "general", "code").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardType {
    id: CardTypeId,
    name: String,
}

impl CardType {
    /// # Errors
    ///
    /// Returns `CardError::EmptyTypeName` if the name is blank.
    pub fn new(id: CardTypeId, name: impl Into<String>) -> Result<Self, CardError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(CardError::EmptyTypeName);
        }
        Ok(Self { id, name })
    }

    #[must_use]
    pub fn id(&self) -> CardTypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// A single flashcard with a prompt (front) and an answer (back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    id: CardId,
    type_id: CardTypeId,
    front: String,
    back: String,
    known: bool,
}

impl Card {
    /// # Errors
    ///
    /// Returns `CardError::EmptyFront` if the prompt is blank.
    pub fn new(
        id: CardId,
        type_id: CardTypeId,
        front: impl Into<String>,
        back: impl Into<String>,
        known: bool,
    ) -> Result<Self, CardError> {
        let front = front.into();
        if front.trim().is_empty() {
            return Err(CardError::EmptyFront);
        }
        Ok(Self {
            id,
            type_id,
            front,
            back: back.into(),
            known,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn type_id(&self) -> CardTypeId {
        self.type_id
    }

    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.known
    }

    pub fn set_known(&mut self, known: bool) {
        self.known = known;
    }
}

//
// ─── MULTIPLE CHOICE OPTION ────────────────────────────────────────────────────
//

/// One selectable answer attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    id: OptionId,
    card_id: CardId,
    text: String,
    is_correct: bool,
}

impl ChoiceOption {
    /// # Errors
    ///
    /// Returns `CardError::EmptyChoice` if the text is blank.
    pub fn new(
        id: OptionId,
        card_id: CardId,
        text: impl Into<String>,
        is_correct: bool,
    ) -> Result<Self, CardError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CardError::EmptyChoice);
        }
        Ok(Self {
            id,
            card_id,
            text,
            is_correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

//
// ─── ORDERED ITEM ──────────────────────────────────────────────────────────────
//

/// One element of a card's canonical sequence.
///
/// `position` is zero-based and unique per card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    id: ItemId,
    card_id: CardId,
    text: String,
    position: u32,
}

impl OrderedItem {
    /// # Errors
    ///
    /// Returns `CardError::EmptyItem` if the text is blank.
    pub fn new(
        id: ItemId,
        card_id: CardId,
        text: impl Into<String>,
        position: u32,
    ) -> Result<Self, CardError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CardError::EmptyItem);
        }
        Ok(Self {
            id,
            card_id,
            text,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn card_id(&self) -> CardId {
        self.card_id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_type_trims_and_rejects_blank_names() {
        let ty = CardType::new(CardTypeId::new(1), "  geography ").unwrap();
        assert_eq!(ty.name(), "geography");

        let err = CardType::new(CardTypeId::new(2), "   ").unwrap_err();
        assert_eq!(err, CardError::EmptyTypeName);
    }

    #[test]
    fn card_requires_front_text() {
        let err = Card::new(CardId::new(1), CardTypeId::new(1), " ", "back", false).unwrap_err();
        assert_eq!(err, CardError::EmptyFront);
    }

    #[test]
    fn card_allows_empty_back_and_toggles_known() {
        let mut card = Card::new(CardId::new(1), CardTypeId::new(1), "front", "", false).unwrap();
        assert!(!card.is_known());
        card.set_known(true);
        assert!(card.is_known());
    }

    #[test]
    fn option_and_item_reject_blank_text() {
        assert_eq!(
            ChoiceOption::new(OptionId::new(1), CardId::new(1), "", true).unwrap_err(),
            CardError::EmptyChoice
        );
        assert_eq!(
            OrderedItem::new(ItemId::new(1), CardId::new(1), "\t", 0).unwrap_err(),
            CardError::EmptyItem
        );
    }
}
