use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use cards_core::model::{
    Card, CardId, CardType, ItemId, OrderedItem, OrderedQuestion, OrderedQuiz, OrderedQuizDraft,
    QuizId, QuizKind, ResultSummary, Score,
};
use cards_core::scoring::{canonical_order, score_ordered_quiz, sequence_matches};
use storage::repository::{
    CardRepository, OrderedQuizRepository, ResultRepository, StorageError,
};

use crate::Clock;
use crate::error::QuizError;
use crate::selection::{non_canonical_shuffle, select_cards};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedQuestionView {
    pub card_id: CardId,
    pub prompt: String,
    pub items: Vec<ItemView>,
}

/// An ordered-item quiz with every card's items in their stored shuffled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedQuizView {
    pub quiz_id: QuizId,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<OrderedQuestionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedCardResult {
    pub card_id: CardId,
    pub prompt: String,
    pub is_correct: bool,
    pub canonical: Vec<ItemView>,
    pub submitted: Vec<ItemView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedResultView {
    pub summary: ResultSummary,
    pub cards: Vec<OrderedCardResult>,
    pub incorrect_cards: Vec<CardId>,
}

/// Builds, serves and scores ordered-item quizzes.
#[derive(Clone)]
pub struct OrderedQuizService {
    clock: Clock,
    cards: Arc<dyn CardRepository>,
    quizzes: Arc<dyn OrderedQuizRepository>,
    results: Arc<dyn ResultRepository>,
}

impl OrderedQuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        cards: Arc<dyn CardRepository>,
        quizzes: Arc<dyn OrderedQuizRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            cards,
            quizzes,
            results,
        }
    }

    /// Create a quiz of up to ten random cards of the named type that have ordered items.
    ///
    /// Every card with two or more items is presented in an order different from its
    /// canonical one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::CardTypeNotFound` for an unknown type, or
    /// `QuizError::Storage` if loading or persisting fails.
    pub async fn create_quiz(&self, type_name: &str) -> Result<QuizId, QuizError> {
        let (card_type, candidates) = self.load_candidates(type_name).await?;
        let questions = plan_questions(candidates, &mut rand::rng());
        self.persist(&card_type, questions).await
    }

    /// Same as `create_quiz` with a caller-supplied random source.
    ///
    /// # Errors
    ///
    /// Same as `create_quiz`.
    pub async fn create_quiz_with_rng<R: Rng + ?Sized>(
        &self,
        type_name: &str,
        rng: &mut R,
    ) -> Result<QuizId, QuizError> {
        let (card_type, candidates) = self.load_candidates(type_name).await?;
        let questions = plan_questions(candidates, rng);
        self.persist(&card_type, questions).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::QuizNotFound` if the quiz does not exist.
    pub async fn get_quiz(&self, quiz_id: QuizId) -> Result<OrderedQuizView, QuizError> {
        let quiz = self.load_quiz(quiz_id).await?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for question in &quiz.questions {
            let card = self.load_card(question.card_id).await?;
            let items = self.cards.ordered_items_for_card(question.card_id).await?;
            questions.push(OrderedQuestionView {
                card_id: card.id(),
                prompt: card.front().to_owned(),
                items: item_views(&items, &question.item_order),
            });
        }

        Ok(OrderedQuizView {
            quiz_id: quiz.id,
            created_at: quiz.created_at,
            questions,
        })
    }

    /// Score a submission. `answers` maps each quiz card to its items in the order the
    /// user arranged them; positions are assigned from that order.
    ///
    /// # Errors
    ///
    /// Returns a not-found variant for an unknown quiz, a card outside the quiz or an
    /// item of another card; `MissingAnswer` if a quiz card was skipped;
    /// `DataIntegrity` if a quiz card has no items; `AlreadySubmitted` if the quiz
    /// already has a result.
    pub async fn submit_answers(
        &self,
        quiz_id: QuizId,
        answers: &HashMap<CardId, Vec<ItemId>>,
    ) -> Result<Score, QuizError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if self
            .results
            .get_result(QuizKind::Ordered, quiz_id)
            .await?
            .is_some()
        {
            return Err(QuizError::AlreadySubmitted(quiz_id));
        }

        let mut items = HashMap::with_capacity(quiz.questions.len());
        for card_id in quiz.card_ids() {
            items.insert(card_id, self.cards.ordered_items_for_card(card_id).await?);
        }

        let scoring = score_ordered_quiz(&quiz, &items, answers).map_err(|e| {
            if e.is_data_integrity() {
                tracing::warn!(quiz_id = %quiz_id, error = %e, "ordered card has no items");
            }
            QuizError::from(e)
        })?;

        let summary = ResultSummary::new(QuizKind::Ordered, quiz_id, scoring.score, self.clock.now());
        self.quizzes
            .record_ordered_submission(&scoring.answers, &summary)
            .await
            .map_err(|e| match e {
                StorageError::Conflict => QuizError::AlreadySubmitted(quiz_id),
                StorageError::NotFound => QuizError::QuizNotFound(quiz_id),
                other => QuizError::Storage(other),
            })?;

        tracing::info!(
            quiz_id = %quiz_id,
            correct = scoring.score.correct,
            incorrect = scoring.score.incorrect,
            incorrect_cards = scoring.incorrect_cards.len(),
            "scored ordered submission"
        );
        Ok(scoring.score)
    }

    /// Fetch the stored result with canonical and submitted sequences per card.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ResultNotFound` if the quiz has not been submitted.
    pub async fn get_result(&self, quiz_id: QuizId) -> Result<OrderedResultView, QuizError> {
        let summary = self
            .results
            .get_result(QuizKind::Ordered, quiz_id)
            .await?
            .ok_or(QuizError::ResultNotFound(quiz_id))?;
        let quiz = self.load_quiz(quiz_id).await?;

        let mut submitted: HashMap<CardId, Vec<ItemId>> = HashMap::new();
        for answer in self.quizzes.ordered_answers(quiz_id).await? {
            submitted
                .entry(answer.card_id)
                .or_default()
                .push(answer.item_id);
        }

        let mut cards = Vec::with_capacity(quiz.questions.len());
        let mut incorrect_cards = Vec::new();
        for question in &quiz.questions {
            let card = self.load_card(question.card_id).await?;
            let items = self.cards.ordered_items_for_card(question.card_id).await?;
            let sequence = submitted.remove(&question.card_id).unwrap_or_default();
            let is_correct = sequence_matches(&items, &sequence);
            if !is_correct {
                incorrect_cards.push(card.id());
            }
            cards.push(OrderedCardResult {
                card_id: card.id(),
                prompt: card.front().to_owned(),
                is_correct,
                canonical: item_views(&items, &canonical_order(&items)),
                submitted: item_views(&items, &sequence),
            });
        }

        Ok(OrderedResultView {
            summary,
            cards,
            incorrect_cards,
        })
    }

    async fn load_candidates(
        &self,
        type_name: &str,
    ) -> Result<(CardType, Vec<(Card, Vec<OrderedItem>)>), QuizError> {
        let card_type = self
            .cards
            .find_card_type(type_name)
            .await?
            .ok_or_else(|| QuizError::CardTypeNotFound(type_name.to_owned()))?;

        let mut candidates = Vec::new();
        for card in self.cards.list_cards_by_type(card_type.name()).await? {
            let items = self.cards.ordered_items_for_card(card.id()).await?;
            if !items.is_empty() {
                candidates.push((card, items));
            }
        }
        Ok((card_type, candidates))
    }

    async fn persist(
        &self,
        card_type: &CardType,
        questions: Vec<OrderedQuestion>,
    ) -> Result<QuizId, QuizError> {
        let draft = OrderedQuizDraft::new(card_type.id(), self.clock.now(), questions)?;
        let quiz = self.quizzes.create_ordered_quiz(&draft).await?;
        tracing::info!(
            quiz_id = %quiz.id,
            card_type = card_type.name(),
            questions = quiz.questions.len(),
            "created ordered quiz"
        );
        Ok(quiz.id)
    }

    async fn load_quiz(&self, quiz_id: QuizId) -> Result<OrderedQuiz, QuizError> {
        self.quizzes
            .get_ordered_quiz(quiz_id)
            .await?
            .ok_or(QuizError::QuizNotFound(quiz_id))
    }

    async fn load_card(&self, card_id: CardId) -> Result<Card, QuizError> {
        self.cards
            .get_card(card_id)
            .await?
            .ok_or(QuizError::CardNotFound(card_id))
    }
}

fn plan_questions<R: Rng + ?Sized>(
    candidates: Vec<(Card, Vec<OrderedItem>)>,
    rng: &mut R,
) -> Vec<OrderedQuestion> {
    select_cards(candidates, &mut *rng)
        .into_iter()
        .map(|(card, items)| OrderedQuestion {
            card_id: card.id(),
            item_order: non_canonical_shuffle(&canonical_order(&items), &mut *rng),
        })
        .collect()
}

fn item_views(items: &[OrderedItem], order: &[ItemId]) -> Vec<ItemView> {
    let by_id: HashMap<ItemId, &OrderedItem> = items.iter().map(|i| (i.id(), i)).collect();
    order
        .iter()
        .filter_map(|id| by_id.get(id))
        .map(|i| ItemView {
            id: i.id(),
            text: i.text().to_owned(),
        })
        .collect()
}
