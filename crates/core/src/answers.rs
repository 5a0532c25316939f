use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuestionId;

/// Sentinel collaborators use for an unanswered question.
pub const UNANSWERED_SENTINEL: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer sentinel {raw} is neither -1 nor a valid option index")]
    InvalidSentinel { raw: i64 },
}

/// Number of answers does not match the session's shuffled order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected {expected} answers, got {got}")]
pub struct AnswerCountMismatch {
    pub expected: usize,
    pub got: usize,
}

/// A single positional answer: the selected option index for the question
/// at the same position in the session's shuffled order, or no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Unanswered,
    Selected(usize),
}

impl Answer {
    /// Parses the collaborator-facing wire form: `-1` means unanswered,
    /// non-negative values are option indices.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidSentinel` for values below -1.
    pub fn from_sentinel(raw: i64) -> Result<Self, AnswerError> {
        match raw {
            UNANSWERED_SENTINEL => Ok(Self::Unanswered),
            n if n >= 0 => {
                let index =
                    usize::try_from(n).map_err(|_| AnswerError::InvalidSentinel { raw })?;
                Ok(Self::Selected(index))
            }
            _ => Err(AnswerError::InvalidSentinel { raw }),
        }
    }

    /// The wire form: `-1` for unanswered, the option index otherwise.
    ///
    /// # Panics
    ///
    /// Panics if a selected index does not fit in `i64`; indices come from
    /// option lists and never approach that bound.
    #[must_use]
    pub fn as_sentinel(&self) -> i64 {
        match self {
            Self::Unanswered => UNANSWERED_SENTINEL,
            Self::Selected(index) => {
                i64::try_from(*index).expect("option index should fit in i64")
            }
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        match self {
            Self::Unanswered => None,
            Self::Selected(index) => Some(*index),
        }
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Selected(_))
    }
}

/// An answer realigned to its canonical question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedAnswer {
    pub question_id: QuestionId,
    pub answer: Answer,
}

/// Realigns positional answers to canonical question ids.
///
/// Position i in `answers` corresponds to position i in `shuffled_order`;
/// this is the entire contract, so the zip is strict — nothing is
/// reordered, truncated, or padded.
///
/// # Errors
///
/// Returns `AnswerCountMismatch` when the two sequences differ in length.
pub fn map_answers(
    shuffled_order: &[QuestionId],
    answers: &[Answer],
) -> Result<Vec<MappedAnswer>, AnswerCountMismatch> {
    if answers.len() != shuffled_order.len() {
        return Err(AnswerCountMismatch {
            expected: shuffled_order.len(),
            got: answers.len(),
        });
    }

    Ok(shuffled_order
        .iter()
        .zip(answers)
        .map(|(question_id, answer)| MappedAnswer {
            question_id: *question_id,
            answer: *answer,
        })
        .collect())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
