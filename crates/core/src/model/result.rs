use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::quiz::QuizKind;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("percentage {0} is outside 0..=100")]
    PercentageOutOfRange(f64),

    #[error("percentage {stored} does not match counts ({correct} correct, {incorrect} incorrect)")]
    PercentageMismatch {
        stored: f64,
        correct: u32,
        incorrect: u32,
    },
}

/// Correct/incorrect counts for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
    pub percentage: f64,
}

impl Score {
    /// Builds a score from counts. An empty quiz scores `0.0`.
    #[must_use]
    pub fn from_counts(correct: u32, incorrect: u32) -> Self {
        let total = u64::from(correct) + u64::from(incorrect);
        #[allow(clippy::cast_precision_loss)]
        let percentage = if total == 0 {
            0.0
        } else {
            f64::from(correct) / total as f64 * 100.0
        };
        Self {
            correct,
            incorrect,
            percentage,
        }
    }
}

/// Persisted scoring outcome of one submitted quiz instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    kind: QuizKind,
    quiz_id: QuizId,
    score: Score,
    created_at: DateTime<Utc>,
}

impl ResultSummary {
    #[must_use]
    pub fn new(kind: QuizKind, quiz_id: QuizId, score: Score, created_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            quiz_id,
            score,
            created_at,
        }
    }

    /// Rehydrate a summary from storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if the stored percentage is out of range or disagrees
    /// with the stored counts.
    pub fn from_persisted(
        kind: QuizKind,
        quiz_id: QuizId,
        correct: u32,
        incorrect: u32,
        percentage: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        if !(0.0..=100.0).contains(&percentage) {
            return Err(ResultError::PercentageOutOfRange(percentage));
        }
        let expected = Score::from_counts(correct, incorrect);
        if (expected.percentage - percentage).abs() > 1e-6 {
            return Err(ResultError::PercentageMismatch {
                stored: percentage,
                correct,
                incorrect,
            });
        }
        Ok(Self::new(kind, quiz_id, expected, created_at))
    }

    #[must_use]
    pub fn kind(&self) -> QuizKind {
        self.kind
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn empty_score_is_zero_percent() {
        let score = Score::from_counts(0, 0);
        assert_eq!(score.percentage, 0.0);
        assert_eq!((score.correct, score.incorrect), (0, 0));
    }

    #[test]
    fn percentage_uses_both_counts() {
        assert_eq!(Score::from_counts(5, 0).percentage, 100.0);
        assert_eq!(Score::from_counts(0, 5).percentage, 0.0);
        assert_eq!(Score::from_counts(1, 3).percentage, 25.0);
    }

    #[test]
    fn from_persisted_validates_percentage() {
        let ok = ResultSummary::from_persisted(
            QuizKind::Ordered,
            QuizId::new(1),
            1,
            1,
            50.0,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(ok.score().correct, 1);
        assert_eq!(ok.kind(), QuizKind::Ordered);

        let err = ResultSummary::from_persisted(
            QuizKind::Ordered,
            QuizId::new(1),
            1,
            1,
            120.0,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, ResultError::PercentageOutOfRange(_)));

        let err = ResultSummary::from_persisted(
            QuizKind::MultipleChoice,
            QuizId::new(1),
            1,
            1,
            75.0,
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, ResultError::PercentageMismatch { .. }));
    }
}
