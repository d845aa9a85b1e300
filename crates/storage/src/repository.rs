use async_trait::async_trait;
use cards_core::model::{
    Card, CardError, CardId, CardType, CardTypeId, ChoiceAnswer, ChoiceOption, ChoiceQuiz,
    ChoiceQuizDraft, ItemId, OptionId, OrderedAnswer, OrderedItem, OrderedQuiz,
    OrderedQuizDraft, QuizId, QuizKind, ResultSummary,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<CardError> for StorageError {
    fn from(e: CardError) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

//
// ─── INSERT RECORDS ────────────────────────────────────────────────────────────
//

/// Card fields supplied by the caller; the store allocates the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCardRecord {
    pub type_id: CardTypeId,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOptionRecord {
    pub card_id: CardId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItemRecord {
    pub card_id: CardId,
    pub text: String,
    pub position: u32,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to cards and their answer keys, plus the minimal writes used by
/// seeding and the study flow.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Create a card type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is taken.
    async fn insert_card_type(&self, name: &str) -> Result<CardType, StorageError>;

    /// Create a card under an existing type.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the type does not exist.
    async fn insert_card(&self, card: NewCardRecord) -> Result<Card, StorageError>;

    /// Attach a multiple-choice option to a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn insert_option(&self, option: NewOptionRecord) -> Result<ChoiceOption, StorageError>;

    /// Attach an ordered item to a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist, or
    /// `StorageError::Conflict` if the position is already used on that card.
    async fn insert_ordered_item(&self, item: NewItemRecord) -> Result<OrderedItem, StorageError>;

    async fn find_card_type(&self, name: &str) -> Result<Option<CardType>, StorageError>;

    /// All card types ordered by id.
    async fn list_card_types(&self) -> Result<Vec<CardType>, StorageError>;

    /// Cards belonging to the named type, ordered by id. Unknown names yield no cards.
    async fn list_cards_by_type(&self, type_name: &str) -> Result<Vec<Card>, StorageError>;

    async fn get_card(&self, id: CardId) -> Result<Option<Card>, StorageError>;

    /// Options of a card ordered by id.
    async fn options_for_card(&self, id: CardId) -> Result<Vec<ChoiceOption>, StorageError>;

    /// Ordered items of a card sorted by canonical position.
    async fn ordered_items_for_card(&self, id: CardId) -> Result<Vec<OrderedItem>, StorageError>;

    /// Update the known flag of a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn set_known(&self, id: CardId, known: bool) -> Result<(), StorageError>;

    /// Reset the known flag on every card of a type. Returns the number of cards touched.
    async fn clear_known(&self, type_id: CardTypeId) -> Result<u64, StorageError>;
}

/// Persistence for multiple-choice quiz instances and their answers.
#[async_trait]
pub trait ChoiceQuizRepository: Send + Sync {
    /// Write the instance, its question links and option orders in one transaction.
    async fn create_choice_quiz(&self, draft: &ChoiceQuizDraft)
    -> Result<ChoiceQuiz, StorageError>;

    async fn get_choice_quiz(&self, id: QuizId) -> Result<Option<ChoiceQuiz>, StorageError>;

    /// Write answer rows and the result summary in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist and
    /// `StorageError::Conflict` if a result was already recorded for it.
    async fn record_choice_submission(
        &self,
        answers: &[ChoiceAnswer],
        result: &ResultSummary,
    ) -> Result<(), StorageError>;

    /// Answer rows of a quiz in insertion order.
    async fn choice_answers(&self, id: QuizId) -> Result<Vec<ChoiceAnswer>, StorageError>;
}

/// Persistence for ordered-item quiz instances and their answers.
#[async_trait]
pub trait OrderedQuizRepository: Send + Sync {
    /// Write the instance, its question links and item orders in one transaction.
    async fn create_ordered_quiz(
        &self,
        draft: &OrderedQuizDraft,
    ) -> Result<OrderedQuiz, StorageError>;

    async fn get_ordered_quiz(&self, id: QuizId) -> Result<Option<OrderedQuiz>, StorageError>;

    /// Write answer rows and the result summary in one transaction.
    ///
    /// # Errors
    ///
    /// Same contract as `ChoiceQuizRepository::record_choice_submission`.
    async fn record_ordered_submission(
        &self,
        answers: &[OrderedAnswer],
        result: &ResultSummary,
    ) -> Result<(), StorageError>;

    /// Answer rows of a quiz ordered by card, then submitted position.
    async fn ordered_answers(&self, id: QuizId) -> Result<Vec<OrderedAnswer>, StorageError>;
}

/// Read side of the result store. Results are written by the submission methods above.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn get_result(
        &self,
        kind: QuizKind,
        quiz_id: QuizId,
    ) -> Result<Option<ResultSummary>, StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    card_types: BTreeMap<CardTypeId, CardType>,
    cards: BTreeMap<CardId, Card>,
    options: BTreeMap<OptionId, ChoiceOption>,
    items: BTreeMap<ItemId, OrderedItem>,
    choice_quizzes: BTreeMap<QuizId, ChoiceQuiz>,
    ordered_quizzes: BTreeMap<QuizId, OrderedQuiz>,
    choice_answers: Vec<ChoiceAnswer>,
    ordered_answers: Vec<OrderedAnswer>,
    results: HashMap<(QuizKind, QuizId), ResultSummary>,
    last_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn type_by_name(&self, name: &str) -> Option<&CardType> {
        self.card_types.values().find(|t| t.name() == name)
    }

    fn check_no_result(&self, result: &ResultSummary) -> Result<(), StorageError> {
        if self.results.contains_key(&(result.kind(), result.quiz_id())) {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All state sits behind one mutex, so every call is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn insert_card_type(&self, name: &str) -> Result<CardType, StorageError> {
        let mut guard = self.lock()?;
        if guard.type_by_name(name.trim()).is_some() {
            return Err(StorageError::Conflict);
        }
        let card_type = CardType::new(CardTypeId::new(guard.next_id()), name)?;
        guard.card_types.insert(card_type.id(), card_type.clone());
        Ok(card_type)
    }

    async fn insert_card(&self, card: NewCardRecord) -> Result<Card, StorageError> {
        let mut guard = self.lock()?;
        if !guard.card_types.contains_key(&card.type_id) {
            return Err(StorageError::NotFound);
        }
        let card = Card::new(
            CardId::new(guard.next_id()),
            card.type_id,
            card.front,
            card.back,
            false,
        )?;
        guard.cards.insert(card.id(), card.clone());
        Ok(card)
    }

    async fn insert_option(&self, option: NewOptionRecord) -> Result<ChoiceOption, StorageError> {
        let mut guard = self.lock()?;
        if !guard.cards.contains_key(&option.card_id) {
            return Err(StorageError::NotFound);
        }
        let option = ChoiceOption::new(
            OptionId::new(guard.next_id()),
            option.card_id,
            option.text,
            option.is_correct,
        )?;
        guard.options.insert(option.id(), option.clone());
        Ok(option)
    }

    async fn insert_ordered_item(&self, item: NewItemRecord) -> Result<OrderedItem, StorageError> {
        let mut guard = self.lock()?;
        if !guard.cards.contains_key(&item.card_id) {
            return Err(StorageError::NotFound);
        }
        let taken = guard
            .items
            .values()
            .any(|i| i.card_id() == item.card_id && i.position() == item.position);
        if taken {
            return Err(StorageError::Conflict);
        }
        let item = OrderedItem::new(
            ItemId::new(guard.next_id()),
            item.card_id,
            item.text,
            item.position,
        )?;
        guard.items.insert(item.id(), item.clone());
        Ok(item)
    }

    async fn find_card_type(&self, name: &str) -> Result<Option<CardType>, StorageError> {
        Ok(self.lock()?.type_by_name(name).cloned())
    }

    async fn list_card_types(&self) -> Result<Vec<CardType>, StorageError> {
        Ok(self.lock()?.card_types.values().cloned().collect())
    }

    async fn list_cards_by_type(&self, type_name: &str) -> Result<Vec<Card>, StorageError> {
        let guard = self.lock()?;
        let Some(type_id) = guard.type_by_name(type_name).map(CardType::id) else {
            return Ok(Vec::new());
        };
        Ok(guard
            .cards
            .values()
            .filter(|c| c.type_id() == type_id)
            .cloned()
            .collect())
    }

    async fn get_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        Ok(self.lock()?.cards.get(&id).cloned())
    }

    async fn options_for_card(&self, id: CardId) -> Result<Vec<ChoiceOption>, StorageError> {
        Ok(self
            .lock()?
            .options
            .values()
            .filter(|o| o.card_id() == id)
            .cloned()
            .collect())
    }

    async fn ordered_items_for_card(&self, id: CardId) -> Result<Vec<OrderedItem>, StorageError> {
        let mut items: Vec<OrderedItem> = self
            .lock()?
            .items
            .values()
            .filter(|i| i.card_id() == id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.position(), i.id()));
        Ok(items)
    }

    async fn set_known(&self, id: CardId, known: bool) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let card = guard.cards.get_mut(&id).ok_or(StorageError::NotFound)?;
        card.set_known(known);
        Ok(())
    }

    async fn clear_known(&self, type_id: CardTypeId) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let mut touched = 0_u64;
        for card in guard.cards.values_mut().filter(|c| c.type_id() == type_id) {
            card.set_known(false);
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl ChoiceQuizRepository for InMemoryRepository {
    async fn create_choice_quiz(
        &self,
        draft: &ChoiceQuizDraft,
    ) -> Result<ChoiceQuiz, StorageError> {
        let mut guard = self.lock()?;
        if !guard.card_types.contains_key(&draft.card_type_id()) {
            return Err(StorageError::NotFound);
        }
        let quiz = draft.clone().assign_id(QuizId::new(guard.next_id()));
        guard.choice_quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get_choice_quiz(&self, id: QuizId) -> Result<Option<ChoiceQuiz>, StorageError> {
        Ok(self.lock()?.choice_quizzes.get(&id).cloned())
    }

    async fn record_choice_submission(
        &self,
        answers: &[ChoiceAnswer],
        result: &ResultSummary,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.choice_quizzes.contains_key(&result.quiz_id()) {
            return Err(StorageError::NotFound);
        }
        guard.check_no_result(result)?;
        guard.choice_answers.extend_from_slice(answers);
        guard
            .results
            .insert((result.kind(), result.quiz_id()), result.clone());
        Ok(())
    }

    async fn choice_answers(&self, id: QuizId) -> Result<Vec<ChoiceAnswer>, StorageError> {
        Ok(self
            .lock()?
            .choice_answers
            .iter()
            .filter(|a| a.quiz_id == id)
            .copied()
            .collect())
    }
}

#[async_trait]
impl OrderedQuizRepository for InMemoryRepository {
    async fn create_ordered_quiz(
        &self,
        draft: &OrderedQuizDraft,
    ) -> Result<OrderedQuiz, StorageError> {
        let mut guard = self.lock()?;
        if !guard.card_types.contains_key(&draft.card_type_id()) {
            return Err(StorageError::NotFound);
        }
        let quiz = draft.clone().assign_id(QuizId::new(guard.next_id()));
        guard.ordered_quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get_ordered_quiz(&self, id: QuizId) -> Result<Option<OrderedQuiz>, StorageError> {
        Ok(self.lock()?.ordered_quizzes.get(&id).cloned())
    }

    async fn record_ordered_submission(
        &self,
        answers: &[OrderedAnswer],
        result: &ResultSummary,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.ordered_quizzes.contains_key(&result.quiz_id()) {
            return Err(StorageError::NotFound);
        }
        guard.check_no_result(result)?;
        guard.ordered_answers.extend_from_slice(answers);
        guard
            .results
            .insert((result.kind(), result.quiz_id()), result.clone());
        Ok(())
    }

    async fn ordered_answers(&self, id: QuizId) -> Result<Vec<OrderedAnswer>, StorageError> {
        let mut answers: Vec<OrderedAnswer> = self
            .lock()?
            .ordered_answers
            .iter()
            .filter(|a| a.quiz_id == id)
            .copied()
            .collect();
        answers.sort_by_key(|a| (a.card_id, a.position));
        Ok(answers)
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn get_result(
        &self,
        kind: QuizKind,
        quiz_id: QuizId,
    ) -> Result<Option<ResultSummary>, StorageError> {
        Ok(self.lock()?.results.get(&(kind, quiz_id)).cloned())
    }
}

/// Aggregates repository trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub cards: Arc<dyn CardRepository>,
    pub choice_quizzes: Arc<dyn ChoiceQuizRepository>,
    pub ordered_quizzes: Arc<dyn OrderedQuizRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            cards: Arc::new(repo.clone()),
            choice_quizzes: Arc::new(repo.clone()),
            ordered_quizzes: Arc::new(repo.clone()),
            results: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cards_core::model::{ChoiceQuestion, Score};
    use cards_core::time::fixed_now;

    async fn seed_card(repo: &InMemoryRepository) -> (CardType, Card) {
        let ty = repo.insert_card_type("geography").await.unwrap();
        let card = repo
            .insert_card(NewCardRecord {
                type_id: ty.id(),
                front: "Capital of France?".into(),
                back: "Paris".into(),
            })
            .await
            .unwrap();
        (ty, card)
    }

    #[tokio::test]
    async fn rejects_duplicate_type_names_and_orphans() {
        let repo = InMemoryRepository::new();
        repo.insert_card_type("code").await.unwrap();
        assert!(matches!(
            repo.insert_card_type("code").await.unwrap_err(),
            StorageError::Conflict
        ));

        let err = repo
            .insert_card(NewCardRecord {
                type_id: CardTypeId::new(999),
                front: "Q".into(),
                back: "A".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn ordered_items_come_back_by_position() {
        let repo = InMemoryRepository::new();
        let (_, card) = seed_card(&repo).await;
        for (text, position) in [("end", 2), ("intro", 0), ("body", 1)] {
            repo.insert_ordered_item(NewItemRecord {
                card_id: card.id(),
                text: text.into(),
                position,
            })
            .await
            .unwrap();
        }
        let err = repo
            .insert_ordered_item(NewItemRecord {
                card_id: card.id(),
                text: "again".into(),
                position: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let texts: Vec<String> = repo
            .ordered_items_for_card(card.id())
            .await
            .unwrap()
            .iter()
            .map(|i| i.text().to_owned())
            .collect();
        assert_eq!(texts, ["intro", "body", "end"]);
    }

    #[tokio::test]
    async fn second_submission_conflicts() {
        let repo = InMemoryRepository::new();
        let (ty, card) = seed_card(&repo).await;
        let draft = ChoiceQuizDraft::new(
            ty.id(),
            fixed_now(),
            vec![ChoiceQuestion {
                card_id: card.id(),
                option_order: Vec::new(),
            }],
        )
        .unwrap();
        let quiz = repo.create_choice_quiz(&draft).await.unwrap();
        assert_eq!(repo.get_choice_quiz(quiz.id).await.unwrap(), Some(quiz.clone()));

        let result = ResultSummary::new(
            QuizKind::MultipleChoice,
            quiz.id,
            Score::from_counts(0, 0),
            fixed_now(),
        );
        repo.record_choice_submission(&[], &result).await.unwrap();
        assert!(matches!(
            repo.record_choice_submission(&[], &result).await.unwrap_err(),
            StorageError::Conflict
        ));
        assert_eq!(
            repo.get_result(QuizKind::MultipleChoice, quiz.id)
                .await
                .unwrap(),
            Some(result)
        );
        assert_eq!(repo.get_result(QuizKind::Ordered, quiz.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn known_flags_toggle_and_clear() {
        let repo = InMemoryRepository::new();
        let (ty, card) = seed_card(&repo).await;
        repo.set_known(card.id(), true).await.unwrap();
        assert!(repo.get_card(card.id()).await.unwrap().unwrap().is_known());

        assert_eq!(repo.clear_known(ty.id()).await.unwrap(), 1);
        assert!(!repo.get_card(card.id()).await.unwrap().unwrap().is_known());
        assert!(matches!(
            repo.set_known(CardId::new(404), true).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
