//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::answers::AnswerCountMismatch;
use exam_core::model::{ExamId, QuestionId, ScoreError, SessionId, SessionStateError, StudentId};
use storage::repository::StorageError;

/// Errors emitted by `ExamSessionService`.
///
/// `AlreadyCompleted` and a resumed start are the two idempotency-related
/// outcomes callers must tell apart: resuming is a success carrying the
/// original session, replaying a submit is this error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("exam {0} not found")]
    ExamNotFound(ExamId),

    #[error("exam {0} has no questions")]
    EmptyExam(ExamId),

    #[error("student {student_id} already has a score for exam {exam_id}")]
    AlreadyScored {
        student_id: StudentId,
        exam_id: ExamId,
    },

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session {0} does not belong to the claimed student and exam")]
    SessionMismatch(SessionId),

    #[error("session {0} is already completed")]
    AlreadyCompleted(SessionId),

    #[error(transparent)]
    AnswerCount(#[from] AnswerCountMismatch),

    #[error("answer at position {position} selects option {selected} but only {available} exist")]
    InvalidAnswer {
        position: usize,
        selected: usize,
        available: usize,
    },

    #[error("session {session_id} references question {question_id} missing from its exam")]
    DataIntegrity {
        session_id: SessionId,
        question_id: QuestionId,
    },

    #[error(transparent)]
    Session(#[from] SessionStateError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
