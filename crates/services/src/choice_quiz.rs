use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use cards_core::model::{
    Card, CardId, CardType, ChoiceOption, ChoiceQuestion, ChoiceQuiz, ChoiceQuizDraft, OptionId,
    QuizId, QuizKind, ResultSummary, Score,
};
use cards_core::scoring::score_choice_quiz;
use storage::repository::{
    CardRepository, ChoiceQuizRepository, ResultRepository, StorageError,
};

use crate::Clock;
use crate::error::QuizError;
use crate::selection::{select_cards, shuffled};

/// An option as shown to the quiz taker. The correct flag is withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceQuestionView {
    pub card_id: CardId,
    pub prompt: String,
    pub options: Vec<OptionView>,
}

/// A multiple-choice quiz in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceQuizView {
    pub quiz_id: QuizId,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<ChoiceQuestionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionOutcome {
    pub id: OptionId,
    pub text: String,
    pub selected: bool,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceCardResult {
    pub card_id: CardId,
    pub prompt: String,
    pub is_correct: bool,
    pub options: Vec<OptionOutcome>,
}

/// Stored summary plus the per-card breakdown of a submitted quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceResultView {
    pub summary: ResultSummary,
    pub cards: Vec<ChoiceCardResult>,
}

/// Builds, serves and scores multiple-choice quizzes.
#[derive(Clone)]
pub struct ChoiceQuizService {
    clock: Clock,
    cards: Arc<dyn CardRepository>,
    quizzes: Arc<dyn ChoiceQuizRepository>,
    results: Arc<dyn ResultRepository>,
}

impl ChoiceQuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        cards: Arc<dyn CardRepository>,
        quizzes: Arc<dyn ChoiceQuizRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            cards,
            quizzes,
            results,
        }
    }

    /// Create a quiz of up to ten random cards of the named type.
    ///
    /// Every card of the type is a candidate, even one without options. A type with
    /// no cards yields an empty quiz.
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

    /// Fetch a quiz with its stored presentation order.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuizNotFound` if the quiz does not exist.
    pub async fn get_quiz(&self, quiz_id: QuizId) -> Result<ChoiceQuizView, QuizError> {
        let quiz = self.load_quiz(quiz_id).await?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for question in &quiz.questions {
            let card = self.load_card(question.card_id).await?;
            let options = self.cards.options_for_card(question.card_id).await?;
            let by_id: HashMap<OptionId, &ChoiceOption> =
                options.iter().map(|o| (o.id(), o)).collect();

            questions.push(ChoiceQuestionView {
                card_id: card.id(),
                prompt: card.front().to_owned(),
                options: question
                    .option_order
                    .iter()
                    .filter_map(|id| by_id.get(id))
                    .map(|o| OptionView {
                        id: o.id(),
                        text: o.text().to_owned(),
                    })
                    .collect(),
            });
        }

        Ok(ChoiceQuizView {
            quiz_id: quiz.id,
            created_at: quiz.created_at,
            questions,
        })
    }

    /// Score a submission and persist its answers together with the result.
    ///
    /// `answers` maps each quiz card to the selected option.
    ///
    /// # Errors
    ///
    /// Returns a not-found variant for an unknown quiz, a card outside the quiz or an
    /// option of another card; `MissingAnswer` if a quiz card was skipped;
    /// `DataIntegrity` if a card does not have exactly one correct option;
    /// `AlreadySubmitted` if the quiz already has a result.
    pub async fn submit_answers(
        &self,
        quiz_id: QuizId,
        answers: &HashMap<CardId, OptionId>,
    ) -> Result<Score, QuizError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if self
            .results
            .get_result(QuizKind::MultipleChoice, quiz_id)
            .await?
            .is_some()
        {
            return Err(QuizError::AlreadySubmitted(quiz_id));
        }

        let mut options = HashMap::with_capacity(quiz.questions.len());
        for card_id in quiz.card_ids() {
            options.insert(card_id, self.cards.options_for_card(card_id).await?);
        }

        let scoring = score_choice_quiz(&quiz, &options, answers).map_err(|e| {
            if e.is_data_integrity() {
                tracing::warn!(quiz_id = %quiz_id, error = %e, "answer key is inconsistent");
            }
            QuizError::from(e)
        })?;

        let summary = ResultSummary::new(
            QuizKind::MultipleChoice,
            quiz_id,
            scoring.score,
            self.clock.now(),
        );
        self.quizzes
            .record_choice_submission(&scoring.answers, &summary)
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
            percentage = scoring.score.percentage,
            "scored multiple-choice submission"
        );
        Ok(scoring.score)
    }

    /// Fetch the stored result with each card's options marked selected/correct.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::ResultNotFound` if the quiz has not been submitted.
    pub async fn get_result(&self, quiz_id: QuizId) -> Result<ChoiceResultView, QuizError> {
        let summary = self
            .results
            .get_result(QuizKind::MultipleChoice, quiz_id)
            .await?
            .ok_or(QuizError::ResultNotFound(quiz_id))?;
        let quiz = self.load_quiz(quiz_id).await?;
        let answers = self.quizzes.choice_answers(quiz_id).await?;

        let mut cards = Vec::with_capacity(answers.len());
        for answer in &answers {
            let card = self.load_card(answer.card_id).await?;
            let options = self.cards.options_for_card(answer.card_id).await?;
            let order = quiz
                .questions
                .iter()
                .find(|q| q.card_id == answer.card_id)
                .map(|q| q.option_order.as_slice())
                .unwrap_or_default();

            let mut outcomes: Vec<OptionOutcome> = options
                .iter()
                .map(|o| OptionOutcome {
                    id: o.id(),
                    text: o.text().to_owned(),
                    selected: o.id() == answer.selected,
                    correct: o.id() == answer.correct,
                })
                .collect();
            outcomes.sort_by_key(|o| order.iter().position(|id| *id == o.id).unwrap_or(usize::MAX));

            cards.push(ChoiceCardResult {
                card_id: card.id(),
                prompt: card.front().to_owned(),
                is_correct: answer.is_correct(),
                options: outcomes,
            });
        }

        Ok(ChoiceResultView { summary, cards })
    }

    async fn load_candidates(
        &self,
        type_name: &str,
    ) -> Result<(CardType, Vec<(Card, Vec<ChoiceOption>)>), QuizError> {
        let card_type = self
            .cards
            .find_card_type(type_name)
            .await?
            .ok_or_else(|| QuizError::CardTypeNotFound(type_name.to_owned()))?;

        // Cards without options stay in; scoring reports them as integrity errors.
        let mut candidates = Vec::new();
        for card in self.cards.list_cards_by_type(card_type.name()).await? {
            let options = self.cards.options_for_card(card.id()).await?;
            candidates.push((card, options));
        }
        Ok((card_type, candidates))
    }

    async fn persist(
        &self,
        card_type: &CardType,
        questions: Vec<ChoiceQuestion>,
    ) -> Result<QuizId, QuizError> {
        let draft = ChoiceQuizDraft::new(card_type.id(), self.clock.now(), questions)?;
        let quiz = self.quizzes.create_choice_quiz(&draft).await?;
        tracing::info!(
            quiz_id = %quiz.id,
            card_type = card_type.name(),
            questions = quiz.questions.len(),
            "created multiple-choice quiz"
        );
        Ok(quiz.id)
    }

    async fn load_quiz(&self, quiz_id: QuizId) -> Result<ChoiceQuiz, QuizError> {
        self.quizzes
            .get_choice_quiz(quiz_id)
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
    candidates: Vec<(Card, Vec<ChoiceOption>)>,
    rng: &mut R,
) -> Vec<ChoiceQuestion> {
    select_cards(candidates, &mut *rng)
        .into_iter()
        .map(|(card, options)| {
            let ids: Vec<OptionId> = options.iter().map(ChoiceOption::id).collect();
            ChoiceQuestion {
                card_id: card.id(),
                option_order: shuffled(&ids, &mut *rng),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{card_type, choice_card, geography};
    use cards_core::scoring::ScoringError;
    use cards_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use storage::repository::Storage;

    fn service(storage: &Storage) -> ChoiceQuizService {
        ChoiceQuizService::new(
            fixed_clock(),
            Arc::clone(&storage.cards),
            Arc::clone(&storage.choice_quizzes),
            Arc::clone(&storage.results),
        )
    }

    fn answer_all(
        cards: &[(Card, Vec<ChoiceOption>)],
        pick_correct: bool,
    ) -> HashMap<CardId, OptionId> {
        cards
            .iter()
            .map(|(card, options)| {
                let option = options
                    .iter()
                    .find(|o| o.is_correct() == pick_correct)
                    .unwrap();
                (card.id(), option.id())
            })
            .collect()
    }

    #[tokio::test]
    async fn selects_ten_of_twelve_without_repeats() {
        let storage = Storage::in_memory();
        let ty = card_type(&storage, "general").await;
        for i in 0..12 {
            choice_card(&storage, &ty, &format!("Q{i}"), &[("a", true), ("b", false)]).await;
        }
        let svc = service(&storage);

        let mut rng = StdRng::seed_from_u64(42);
        let quiz_id = svc.create_quiz_with_rng("general", &mut rng).await.unwrap();
        let view = svc.get_quiz(quiz_id).await.unwrap();
        assert_eq!(view.questions.len(), 10);
        let distinct: HashSet<CardId> = view.questions.iter().map(|q| q.card_id).collect();
        assert_eq!(distinct.len(), 10);
    }

    #[tokio::test]
    async fn small_types_use_every_card() {
        let storage = Storage::in_memory();
        let ty = card_type(&storage, "code").await;
        for i in 0..3 {
            choice_card(&storage, &ty, &format!("Q{i}"), &[("a", true), ("b", false)]).await;
        }
        let bare = crate::test_support::card(&storage, &ty, "no options here").await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("code").await.unwrap();
        let view = svc.get_quiz(quiz_id).await.unwrap();
        assert_eq!(view.questions.len(), 4);
        let question = view.questions.iter().find(|q| q.card_id == bare.id()).unwrap();
        assert!(question.options.is_empty());
    }

    #[tokio::test]
    async fn cards_without_options_fail_scoring_as_integrity_errors() {
        let storage = Storage::in_memory();
        let ty = card_type(&storage, "geography").await;
        let (good, options) =
            choice_card(&storage, &ty, "Capital of Peru?", &[("Lima", true), ("Cusco", false)])
                .await;
        crate::test_support::card(&storage, &ty, "Capital of nowhere?").await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("geography").await.unwrap();
        let answers = HashMap::from([(good.id(), options[0].id())]);
        let err = svc.submit_answers(quiz_id, &answers).await.unwrap_err();
        assert!(matches!(
            err,
            QuizError::DataIntegrity(ScoringError::NoCorrectOption { .. })
        ));
        assert!(matches!(
            svc.get_result(quiz_id).await.unwrap_err(),
            QuizError::ResultNotFound(_)
        ));
    }

    #[tokio::test]
    async fn option_order_varies_between_quizzes() {
        let storage = Storage::in_memory();
        let ty = card_type(&storage, "colors").await;
        choice_card(
            &storage,
            &ty,
            "Color of the sky?",
            &[("blue", true), ("red", false), ("green", false), ("black", false)],
        )
        .await;
        let svc = service(&storage);

        let mut rng = StdRng::seed_from_u64(11);
        let mut layouts = HashSet::new();
        for _ in 0..30 {
            let quiz_id = svc.create_quiz_with_rng("colors", &mut rng).await.unwrap();
            let view = svc.get_quiz(quiz_id).await.unwrap();
            let layout: Vec<OptionId> = view.questions[0].options.iter().map(|o| o.id).collect();
            layouts.insert(layout);
        }
        assert!(layouts.len() > 1, "options were never reshuffled");
    }

    #[tokio::test]
    async fn repeated_fetches_return_identical_layouts() {
        let storage = Storage::in_memory();
        geography(&storage).await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("geography").await.unwrap();
        let first = svc.get_quiz(quiz_id).await.unwrap();
        let second = svc.get_quiz(quiz_id).await.unwrap();
        assert_eq!(first, second);
        assert!(first.questions.iter().all(|q| q.options.len() == 2));
    }

    #[tokio::test]
    async fn quiz_view_does_not_leak_correctness() {
        let storage = Storage::in_memory();
        geography(&storage).await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("geography").await.unwrap();
        let json = serde_json::to_value(svc.get_quiz(quiz_id).await.unwrap()).unwrap();
        let option = &json["questions"][0]["options"][0];
        assert!(option.get("text").is_some());
        assert!(option.get("correct").is_none());
        assert!(option.get("is_correct").is_none());
    }

    #[tokio::test]
    async fn geography_all_correct_scores_full_marks() {
        let storage = Storage::in_memory();
        let cards = geography(&storage).await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("geography").await.unwrap();
        let score = svc
            .submit_answers(quiz_id, &answer_all(&cards, true))
            .await
            .unwrap();
        assert_eq!((score.correct, score.incorrect), (5, 0));
        assert!((score.percentage - 100.0).abs() < f64::EPSILON);

        let result = svc.get_result(quiz_id).await.unwrap();
        assert_eq!(result.summary.score(), score);
        assert_eq!(result.cards.len(), 5);
        for card in &result.cards {
            assert!(card.is_correct);
            assert!(card.options.iter().any(|o| o.selected && o.correct));
        }
    }

    #[tokio::test]
    async fn geography_all_wrong_scores_zero() {
        let storage = Storage::in_memory();
        let cards = geography(&storage).await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("geography").await.unwrap();
        let score = svc
            .submit_answers(quiz_id, &answer_all(&cards, false))
            .await
            .unwrap();
        assert_eq!((score.correct, score.incorrect), (0, 5));
        assert!(score.percentage.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn scoring_is_deterministic_for_identical_answers() {
        let storage = Storage::in_memory();
        let cards = geography(&storage).await;
        let svc = service(&storage);
        let mut answers = answer_all(&cards, true);
        let (first_card, first_options) = &cards[0];
        let wrong = first_options.iter().find(|o| !o.is_correct()).unwrap();
        answers.insert(first_card.id(), wrong.id());

        let a = svc.create_quiz("geography").await.unwrap();
        let b = svc.create_quiz("geography").await.unwrap();
        let score_a = svc.submit_answers(a, &answers).await.unwrap();
        let score_b = svc.submit_answers(b, &answers).await.unwrap();
        assert_eq!(score_a, score_b);
        assert_eq!((score_a.correct, score_a.incorrect), (4, 1));
    }

    #[tokio::test]
    async fn empty_type_gives_empty_quiz_scored_zero() {
        let storage = Storage::in_memory();
        card_type(&storage, "empty").await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("empty").await.unwrap();
        assert!(svc.get_quiz(quiz_id).await.unwrap().questions.is_empty());
        let score = svc.submit_answers(quiz_id, &HashMap::new()).await.unwrap();
        assert_eq!(score, Score::from_counts(0, 0));
        assert!(score.percentage.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unknown_type_and_quiz_are_not_found() {
        let storage = Storage::in_memory();
        let svc = service(&storage);
        assert!(matches!(
            svc.create_quiz("history").await.unwrap_err(),
            QuizError::CardTypeNotFound(_)
        ));
        assert!(matches!(
            svc.get_quiz(QuizId::new(77)).await.unwrap_err(),
            QuizError::QuizNotFound(_)
        ));
        assert!(matches!(
            svc.submit_answers(QuizId::new(77), &HashMap::new())
                .await
                .unwrap_err(),
            QuizError::QuizNotFound(_)
        ));
        assert!(matches!(
            svc.get_result(QuizId::new(77)).await.unwrap_err(),
            QuizError::ResultNotFound(_)
        ));
    }

    #[tokio::test]
    async fn rejects_missing_foreign_and_repeated_submissions() {
        let storage = Storage::in_memory();
        let cards = geography(&storage).await;
        let svc = service(&storage);
        let quiz_id = svc.create_quiz("geography").await.unwrap();

        let mut partial = answer_all(&cards, true);
        partial.remove(&cards[2].0.id());
        assert!(matches!(
            svc.submit_answers(quiz_id, &partial).await.unwrap_err(),
            QuizError::MissingAnswer { card_id } if card_id == cards[2].0.id()
        ));

        let mut foreign_option = answer_all(&cards, true);
        foreign_option.insert(cards[0].0.id(), cards[1].1[0].id());
        assert!(matches!(
            svc.submit_answers(quiz_id, &foreign_option)
                .await
                .unwrap_err(),
            QuizError::OptionNotFound { .. }
        ));

        let mut extra_card = answer_all(&cards, true);
        extra_card.insert(CardId::new(9_999), OptionId::new(1));
        assert!(matches!(
            svc.submit_answers(quiz_id, &extra_card).await.unwrap_err(),
            QuizError::CardNotInQuiz(_)
        ));

        svc.submit_answers(quiz_id, &answer_all(&cards, true))
            .await
            .unwrap();
        assert!(matches!(
            svc.submit_answers(quiz_id, &answer_all(&cards, false))
                .await
                .unwrap_err(),
            QuizError::AlreadySubmitted(_)
        ));
        let stored = svc.get_result(quiz_id).await.unwrap();
        assert_eq!(stored.summary.score().correct, 5);
    }

    #[tokio::test]
    async fn ambiguous_answer_keys_are_integrity_errors() {
        let storage = Storage::in_memory();
        let ty = card_type(&storage, "broken").await;
        let (card, options) =
            choice_card(&storage, &ty, "Pick one", &[("a", true), ("b", true)]).await;
        let svc = service(&storage);

        let quiz_id = svc.create_quiz("broken").await.unwrap();
        let answers = HashMap::from([(card.id(), options[0].id())]);
        let err = svc.submit_answers(quiz_id, &answers).await.unwrap_err();
        assert!(matches!(err, QuizError::DataIntegrity(_)));
        assert!(matches!(
            svc.get_result(quiz_id).await.unwrap_err(),
            QuizError::ResultNotFound(_)
        ));
    }
}
