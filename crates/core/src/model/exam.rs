use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least 2 options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} cannot be empty")]
    EmptyOption { index: usize },

    #[error("correct index {correct} is out of range for {len} options")]
    CorrectIndexOutOfRange { correct: usize, len: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("exam duration must be > 0 minutes")]
    InvalidDuration,

    #[error("duplicate question id {0} in exam")]
    DuplicateQuestionId(QuestionId),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question owned by exactly one exam.
///
/// The correct option index never leaves the engine; callers receive
/// questions through views that strip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct: usize,
}

impl Question {
    /// Creates a new question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the text is blank,
    /// `QuestionError::TooFewOptions` for fewer than 2 options,
    /// `QuestionError::EmptyOption` if any option is blank, and
    /// `QuestionError::CorrectIndexOutOfRange` if `correct` does not index
    /// into `options`.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct: usize,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if correct >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                correct,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            text: text.trim().to_owned(),
            options,
            correct,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Index of the correct option. Server-side only; consulted by the
    /// scoring engine and never included in caller-facing views.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    /// Returns true if `selected` equals the stored correct option index.
    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// An exam with its owned, unordered set of questions.
///
/// Question order is meaningless here; each attempt gets its own
/// session-stable permutation of the question ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    title: String,
    duration_minutes: u32,
    questions: Vec<Question>,
}

impl Exam {
    /// Creates a new exam.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` if the title is blank,
    /// `ExamError::InvalidDuration` for a zero duration, and
    /// `ExamError::DuplicateQuestionId` if two questions share an id.
    pub fn new(
        id: ExamId,
        title: impl Into<String>,
        duration_minutes: u32,
        questions: Vec<Question>,
    ) -> Result<Self, ExamError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if duration_minutes == 0 {
            return Err(ExamError::InvalidDuration);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(ExamError::DuplicateQuestionId(question.id()));
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            duration_minutes,
            questions,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Wall-clock duration in minutes, enforced by the caller's timer.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Looks up a question by id.
    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// The canonical question-id set, in stored order.
    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(Question::id).collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
