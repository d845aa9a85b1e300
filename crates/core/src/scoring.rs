//! Pure scoring for both quiz modes.
//!
//! Nothing here touches storage: callers load the quiz, the answer keys and the
//! submission, and persist whatever comes back.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::{
    CardId, ChoiceAnswer, ChoiceOption, ChoiceQuiz, ItemId, OptionId, OrderedAnswer, OrderedItem,
    OrderedQuiz, Score,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("no answer submitted for card {card_id}")]
    MissingAnswer { card_id: CardId },

    #[error("card {card_id} is not part of this quiz")]
    UnknownCard { card_id: CardId },

    #[error("option {option_id} does not belong to card {card_id}")]
    UnknownOption { card_id: CardId, option_id: OptionId },

    #[error("item {item_id} does not belong to card {card_id}")]
    UnknownItem { card_id: CardId, item_id: ItemId },

    #[error("card {card_id} has no option flagged correct")]
    NoCorrectOption { card_id: CardId },

    #[error("card {card_id} has {count} options flagged correct")]
    MultipleCorrectOptions { card_id: CardId, count: usize },

    #[error("card {card_id} has no ordered items")]
    NoOrderedItems { card_id: CardId },
}

impl ScoringError {
    /// True for errors caused by inconsistent card data rather than by the submission.
    #[must_use]
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            ScoringError::NoCorrectOption { .. }
                | ScoringError::MultipleCorrectOptions { .. }
                | ScoringError::NoOrderedItems { .. }
        )
    }
}

//
// ─── MULTIPLE CHOICE ───────────────────────────────────────────────────────────
//

/// Returns the single option flagged correct for a card.
///
/// # Errors
///
/// Returns `NoCorrectOption` or `MultipleCorrectOptions` when the key is ambiguous.
pub fn correct_option(card_id: CardId, options: &[ChoiceOption]) -> Result<OptionId, ScoringError> {
    let mut correct = options.iter().filter(|o| o.is_correct());
    match (correct.next(), correct.count()) {
        (None, _) => Err(ScoringError::NoCorrectOption { card_id }),
        (Some(option), 0) => Ok(option.id()),
        (Some(_), rest) => Err(ScoringError::MultipleCorrectOptions {
            card_id,
            count: rest + 1,
        }),
    }
}

/// Answer rows plus the aggregate score for one multiple-choice submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceScoring {
    pub answers: Vec<ChoiceAnswer>,
    pub score: Score,
}

/// Score a multiple-choice submission against the stored answer keys.
///
/// `options` maps every quiz card to its current options. Cards are visited in quiz
/// order, so the produced answer rows follow the presentation order.
///
/// # Errors
///
/// Returns `ScoringError` if the submission names a card outside the quiz or an option
/// of another card, omits a quiz card, or if a card's answer key is ambiguous.
pub fn score_choice_quiz(
    quiz: &ChoiceQuiz,
    options: &HashMap<CardId, Vec<ChoiceOption>>,
    submitted: &HashMap<CardId, OptionId>,
) -> Result<ChoiceScoring, ScoringError> {
    reject_foreign_cards(submitted.keys().copied(), |id| quiz.contains(id))?;

    let mut answers = Vec::with_capacity(quiz.questions.len());
    let mut correct = 0_u32;
    let mut incorrect = 0_u32;

    for question in &quiz.questions {
        let card_id = question.card_id;
        let card_options = options.get(&card_id).map_or(&[][..], Vec::as_slice);
        let correct_id = correct_option(card_id, card_options)?;

        let selected = *submitted
            .get(&card_id)
            .ok_or(ScoringError::MissingAnswer { card_id })?;
        if !card_options.iter().any(|o| o.id() == selected) {
            return Err(ScoringError::UnknownOption {
                card_id,
                option_id: selected,
            });
        }

        let answer = ChoiceAnswer {
            quiz_id: quiz.id,
            card_id,
            selected,
            correct: correct_id,
        };
        if answer.is_correct() {
            correct = correct.saturating_add(1);
        } else {
            incorrect = incorrect.saturating_add(1);
        }
        answers.push(answer);
    }

    Ok(ChoiceScoring {
        answers,
        score: Score::from_counts(correct, incorrect),
    })
}

//
// ─── ORDERED ITEMS ─────────────────────────────────────────────────────────────
//

/// Item ids of a card in canonical order.
#[must_use]
pub fn canonical_order(items: &[OrderedItem]) -> Vec<ItemId> {
    let mut sorted: Vec<&OrderedItem> = items.iter().collect();
    sorted.sort_by_key(|item| (item.position(), item.id()));
    sorted.into_iter().map(OrderedItem::id).collect()
}

/// A submitted sequence is correct only if it reproduces the canonical order exactly.
#[must_use]
pub fn sequence_matches(items: &[OrderedItem], submitted: &[ItemId]) -> bool {
    canonical_order(items) == submitted
}

/// Answer rows, aggregate score, and the cards answered incorrectly.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedScoring {
    pub answers: Vec<OrderedAnswer>,
    pub score: Score,
    pub incorrect_cards: Vec<CardId>,
}

/// Score an ordered-item submission. Credit is per card, never per item.
///
/// # Errors
///
/// Returns `ScoringError` if the submission names a card outside the quiz or an item
/// of another card, omits a quiz card, or if a quiz card has no items.
pub fn score_ordered_quiz(
    quiz: &OrderedQuiz,
    items: &HashMap<CardId, Vec<OrderedItem>>,
    submitted: &HashMap<CardId, Vec<ItemId>>,
) -> Result<OrderedScoring, ScoringError> {
    reject_foreign_cards(submitted.keys().copied(), |id| quiz.contains(id))?;

    let mut answers = Vec::new();
    let mut incorrect_cards = Vec::new();
    let mut correct = 0_u32;

    for question in &quiz.questions {
        let card_id = question.card_id;
        let card_items = items.get(&card_id).map_or(&[][..], Vec::as_slice);
        if card_items.is_empty() {
            return Err(ScoringError::NoOrderedItems { card_id });
        }

        let sequence = submitted
            .get(&card_id)
            .ok_or(ScoringError::MissingAnswer { card_id })?;
        let known: HashSet<ItemId> = card_items.iter().map(OrderedItem::id).collect();
        if let Some(item_id) = sequence.iter().find(|id| !known.contains(*id)) {
            return Err(ScoringError::UnknownItem {
                card_id,
                item_id: *item_id,
            });
        }

        for (position, item_id) in (0_u32..).zip(sequence) {
            answers.push(OrderedAnswer {
                quiz_id: quiz.id,
                card_id,
                item_id: *item_id,
                position,
            });
        }

        if sequence_matches(card_items, sequence) {
            correct = correct.saturating_add(1);
        } else {
            incorrect_cards.push(card_id);
        }
    }

    let incorrect = u32::try_from(incorrect_cards.len()).unwrap_or(u32::MAX);
    Ok(OrderedScoring {
        answers,
        score: Score::from_counts(correct, incorrect),
        incorrect_cards,
    })
}

fn reject_foreign_cards(
    submitted: impl Iterator<Item = CardId>,
    in_quiz: impl Fn(CardId) -> bool,
) -> Result<(), ScoringError> {
    let mut foreign: Vec<CardId> = submitted.filter(|id| !in_quiz(*id)).collect();
    foreign.sort();
    match foreign.first() {
        Some(card_id) => Err(ScoringError::UnknownCard { card_id: *card_id }),
        None => Ok(()),
    }
}
