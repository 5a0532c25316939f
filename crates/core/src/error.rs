use thiserror::Error;

use crate::answers::{AnswerCountMismatch, AnswerError};
use crate::model::{ExamError, QuestionError, ScoreError, SessionStateError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Session(#[from] SessionStateError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    AnswerCount(#[from] AnswerCountMismatch),
}
