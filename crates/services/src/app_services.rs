use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::choice_quiz::ChoiceQuizService;
use crate::error::AppServicesError;
use crate::ordered_quiz::OrderedQuizService;
use crate::study_service::StudyService;

/// Assembles the quiz engines and the study flow over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    choice_quizzes: Arc<ChoiceQuizService>,
    ordered_quizzes: Arc<OrderedQuizService>,
    study: Arc<StudyService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over throwaway in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let choice_quizzes = Arc::new(ChoiceQuizService::new(
            clock,
            Arc::clone(&storage.cards),
            Arc::clone(&storage.choice_quizzes),
            Arc::clone(&storage.results),
        ));
        let ordered_quizzes = Arc::new(OrderedQuizService::new(
            clock,
            Arc::clone(&storage.cards),
            Arc::clone(&storage.ordered_quizzes),
            Arc::clone(&storage.results),
        ));
        let study = Arc::new(StudyService::new(Arc::clone(&storage.cards)));

        Self {
            choice_quizzes,
            ordered_quizzes,
            study,
        }
    }

    #[must_use]
    pub fn choice_quizzes(&self) -> Arc<ChoiceQuizService> {
        Arc::clone(&self.choice_quizzes)
    }

    #[must_use]
    pub fn ordered_quizzes(&self) -> Arc<OrderedQuizService> {
        Arc::clone(&self.ordered_quizzes)
    }

    #[must_use]
    pub fn study(&self) -> Arc<StudyService> {
        Arc::clone(&self.study)
    }
}
