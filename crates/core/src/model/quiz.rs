use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CardId, CardTypeId, ItemId, OptionId, QuizId};

/// Upper bound on the number of cards drawn into a single quiz.
pub const MAX_QUIZ_CARDS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizDraftError {
    #[error("quiz holds {len} cards, more than the limit of {MAX_QUIZ_CARDS}")]
    TooManyCards { len: usize },

    #[error("card {0} appears more than once in the quiz")]
    DuplicateCard(CardId),

    #[error("card {0} lists the same entry twice in its presentation order")]
    DuplicateEntry(CardId),

    #[error("unknown quiz kind: {0}")]
    UnknownKind(String),
}

//
// ─── QUIZ KIND ─────────────────────────────────────────────────────────────────
//

/// The two quiz modes; results are keyed by kind plus instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    MultipleChoice,
    Ordered,
}

impl QuizKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizKind::MultipleChoice => "multiple_choice",
            QuizKind::Ordered => "ordered",
        }
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizKind {
    type Err = QuizDraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuizKind::MultipleChoice),
            "ordered" => Ok(QuizKind::Ordered),
            other => Err(QuizDraftError::UnknownKind(other.to_owned())),
        }
    }
}

fn check_cards(
    cards: impl ExactSizeIterator<Item = (CardId, usize, usize)>,
) -> Result<(), QuizDraftError> {
    let len = cards.len();
    if len > MAX_QUIZ_CARDS {
        return Err(QuizDraftError::TooManyCards { len });
    }
    let mut seen = HashSet::with_capacity(len);
    for (card_id, entries, distinct) in cards {
        if !seen.insert(card_id) {
            return Err(QuizDraftError::DuplicateCard(card_id));
        }
        if entries != distinct {
            return Err(QuizDraftError::DuplicateEntry(card_id));
        }
    }
    Ok(())
}

fn distinct_count<T: Eq + std::hash::Hash>(values: &[T]) -> usize {
    values.iter().collect::<HashSet<_>>().len()
}

//
// ─── MULTIPLE CHOICE ───────────────────────────────────────────────────────────
//

/// A selected card together with the presentation order of its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceQuestion {
    pub card_id: CardId,
    pub option_order: Vec<OptionId>,
}

/// A multiple-choice quiz before the store has allocated its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceQuizDraft {
    card_type_id: CardTypeId,
    created_at: DateTime<Utc>,
    questions: Vec<ChoiceQuestion>,
}

impl ChoiceQuizDraft {
    /// # Errors
    ///
    /// Returns `QuizDraftError` if the quiz exceeds `MAX_QUIZ_CARDS`, repeats a card,
    /// or repeats an option inside one card's order.
    pub fn new(
        card_type_id: CardTypeId,
        created_at: DateTime<Utc>,
        questions: Vec<ChoiceQuestion>,
    ) -> Result<Self, QuizDraftError> {
        check_cards(questions.iter().map(|q| {
            (
                q.card_id,
                q.option_order.len(),
                distinct_count(&q.option_order),
            )
        }))?;
        Ok(Self {
            card_type_id,
            created_at,
            questions,
        })
    }

    #[must_use]
    pub fn card_type_id(&self) -> CardTypeId {
        self.card_type_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn questions(&self) -> &[ChoiceQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn assign_id(self, id: QuizId) -> ChoiceQuiz {
        ChoiceQuiz {
            id,
            card_type_id: self.card_type_id,
            created_at: self.created_at,
            questions: self.questions,
        }
    }
}

/// A persisted multiple-choice quiz instance. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceQuiz {
    pub id: QuizId,
    pub card_type_id: CardTypeId,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<ChoiceQuestion>,
}

impl ChoiceQuiz {
    #[must_use]
    pub fn card_ids(&self) -> Vec<CardId> {
        self.questions.iter().map(|q| q.card_id).collect()
    }

    #[must_use]
    pub fn contains(&self, card_id: CardId) -> bool {
        self.questions.iter().any(|q| q.card_id == card_id)
    }
}

/// One scored multiple-choice answer. `correct` is denormalized at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceAnswer {
    pub quiz_id: QuizId,
    pub card_id: CardId,
    pub selected: OptionId,
    pub correct: OptionId,
}

impl ChoiceAnswer {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.selected == self.correct
    }
}

//
// ─── ORDERED ITEMS ─────────────────────────────────────────────────────────────
//

/// A selected card together with the shuffled presentation order of its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedQuestion {
    pub card_id: CardId,
    pub item_order: Vec<ItemId>,
}

/// An ordered-item quiz before the store has allocated its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedQuizDraft {
    card_type_id: CardTypeId,
    created_at: DateTime<Utc>,
    questions: Vec<OrderedQuestion>,
}

impl OrderedQuizDraft {
    /// # Errors
    ///
    /// Returns `QuizDraftError` under the same rules as `ChoiceQuizDraft::new`.
    pub fn new(
        card_type_id: CardTypeId,
        created_at: DateTime<Utc>,
        questions: Vec<OrderedQuestion>,
    ) -> Result<Self, QuizDraftError> {
        check_cards(
            questions
                .iter()
                .map(|q| (q.card_id, q.item_order.len(), distinct_count(&q.item_order))),
        )?;
        Ok(Self {
            card_type_id,
            created_at,
            questions,
        })
    }

    #[must_use]
    pub fn card_type_id(&self) -> CardTypeId {
        self.card_type_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn questions(&self) -> &[OrderedQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn assign_id(self, id: QuizId) -> OrderedQuiz {
        OrderedQuiz {
            id,
            card_type_id: self.card_type_id,
            created_at: self.created_at,
            questions: self.questions,
        }
    }
}

/// A persisted ordered-item quiz instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedQuiz {
    pub id: QuizId,
    pub card_type_id: CardTypeId,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<OrderedQuestion>,
}

impl OrderedQuiz {
    #[must_use]
    pub fn card_ids(&self) -> Vec<CardId> {
        self.questions.iter().map(|q| q.card_id).collect()
    }

    #[must_use]
    pub fn contains(&self, card_id: CardId) -> bool {
        self.questions.iter().any(|q| q.card_id == card_id)
    }
}

/// One submitted item with the position it was placed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedAnswer {
    pub quiz_id: QuizId,
    pub card_id: CardId,
    pub item_id: ItemId,
    pub position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question(card: u64, options: &[u64]) -> ChoiceQuestion {
        ChoiceQuestion {
            card_id: CardId::new(card),
            option_order: options.iter().copied().map(OptionId::new).collect(),
        }
    }

    #[test]
    fn draft_rejects_more_than_ten_cards() {
        let questions = (1..=11).map(|id| question(id, &[id * 10])).collect();
        let err = ChoiceQuizDraft::new(CardTypeId::new(1), fixed_now(), questions).unwrap_err();
        assert_eq!(err, QuizDraftError::TooManyCards { len: 11 });
    }

    #[test]
    fn draft_rejects_repeated_cards_and_options() {
        let err = ChoiceQuizDraft::new(
            CardTypeId::new(1),
            fixed_now(),
            vec![question(1, &[1, 2]), question(1, &[3])],
        )
        .unwrap_err();
        assert_eq!(err, QuizDraftError::DuplicateCard(CardId::new(1)));

        let err = OrderedQuizDraft::new(
            CardTypeId::new(1),
            fixed_now(),
            vec![OrderedQuestion {
                card_id: CardId::new(4),
                item_order: vec![ItemId::new(1), ItemId::new(1)],
            }],
        )
        .unwrap_err();
        assert_eq!(err, QuizDraftError::DuplicateEntry(CardId::new(4)));
    }

    #[test]
    fn empty_quiz_is_valid() {
        let quiz = ChoiceQuizDraft::new(CardTypeId::new(1), fixed_now(), Vec::new())
            .unwrap()
            .assign_id(QuizId::new(9));
        assert_eq!(quiz.id, QuizId::new(9));
        assert!(quiz.card_ids().is_empty());
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [QuizKind::MultipleChoice, QuizKind::Ordered] {
            assert_eq!(kind.as_str().parse::<QuizKind>().unwrap(), kind);
        }
        assert!("essay".parse::<QuizKind>().is_err());
    }
}
