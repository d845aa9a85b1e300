#![forbid(unsafe_code)]

pub mod app_services;
pub mod choice_quiz;
pub mod error;
pub mod ordered_quiz;
pub mod selection;
pub mod study_service;

#[cfg(test)]
mod test_support;

pub use cards_core::Clock;

pub use app_services::AppServices;
pub use choice_quiz::{
    ChoiceCardResult, ChoiceQuestionView, ChoiceQuizService, ChoiceQuizView, ChoiceResultView,
    OptionOutcome, OptionView,
};
pub use error::{AppServicesError, QuizError, StudyError};
pub use ordered_quiz::{
    ItemView, OrderedCardResult, OrderedQuestionView, OrderedQuizService, OrderedQuizView,
    OrderedResultView,
};
pub use study_service::{StudyService, TypeProgress};
