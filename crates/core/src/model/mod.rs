mod card;
mod ids;
mod quiz;
mod result;

pub use ids::{CardId, CardTypeId, ItemId, OptionId, ParseIdError, QuizId};

pub use card::{Card, CardError, CardType, ChoiceOption, OrderedItem};
pub use quiz::{
    ChoiceAnswer, ChoiceQuestion, ChoiceQuiz, ChoiceQuizDraft, MAX_QUIZ_CARDS, OrderedAnswer,
    OrderedQuestion, OrderedQuiz, OrderedQuizDraft, QuizDraftError, QuizKind,
};
pub use result::{ResultError, ResultSummary, Score};
