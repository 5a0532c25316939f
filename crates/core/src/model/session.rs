use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{ExamId, QuestionId, SessionId, StudentId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("shuffled order cannot be empty")]
    EmptyOrder,

    #[error("shuffled order repeats question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("session is already completed")]
    AlreadyCompleted,
}

/// One student's attempt at one exam.
///
/// `shuffled_order` is fixed at creation and is a permutation of the exam's
/// question-id set at that moment; positional answers are interpreted
/// against it. A session is active while `completed_at` is `None` and
/// terminal forever after it is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSession {
    id: SessionId,
    student_id: StudentId,
    exam_id: ExamId,
    shuffled_order: Vec<QuestionId>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Creates a new active session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::EmptyOrder` for an empty order and
    /// `SessionStateError::DuplicateQuestion` if the order repeats an id.
    pub fn new(
        id: SessionId,
        student_id: StudentId,
        exam_id: ExamId,
        shuffled_order: Vec<QuestionId>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        Self::from_persisted(id, student_id, exam_id, shuffled_order, started_at, None)
    }

    /// Rehydrates a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::EmptyOrder` or
    /// `SessionStateError::DuplicateQuestion` if the stored order is not a
    /// valid permutation, and `SessionStateError::InvalidTimeRange` if
    /// `completed_at` precedes `started_at`.
    pub fn from_persisted(
        id: SessionId,
        student_id: StudentId,
        exam_id: ExamId,
        shuffled_order: Vec<QuestionId>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionStateError> {
        if shuffled_order.is_empty() {
            return Err(SessionStateError::EmptyOrder);
        }
        let mut seen = HashSet::with_capacity(shuffled_order.len());
        for question_id in &shuffled_order {
            if !seen.insert(*question_id) {
                return Err(SessionStateError::DuplicateQuestion(*question_id));
            }
        }
        if let Some(completed) = completed_at {
            if completed < started_at {
                return Err(SessionStateError::InvalidTimeRange);
            }
        }

        Ok(Self {
            id,
            student_id,
            exam_id,
            shuffled_order,
            started_at,
            completed_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn shuffled_order(&self) -> &[QuestionId] {
        &self.shuffled_order
    }

    /// Question count captured at session start.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.shuffled_order.len()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }

    /// Marks the session terminal. The transition happens at most once.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::AlreadyCompleted` if the session is
    /// already terminal and `SessionStateError::InvalidTimeRange` if `at`
    /// precedes `started_at`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), SessionStateError> {
        if self.completed_at.is_some() {
            return Err(SessionStateError::AlreadyCompleted);
        }
        if at < self.started_at {
            return Err(SessionStateError::InvalidTimeRange);
        }
        self.completed_at = Some(at);
        Ok(())
    }

    /// Returns true if this session belongs to the given (student, exam) pair.
    #[must_use]
    pub fn belongs_to(&self, student_id: StudentId, exam_id: ExamId) -> bool {
        self.student_id == student_id && self.exam_id == exam_id
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn order(ids: &[u64]) -> Vec<QuestionId> {
        ids.iter().map(|i| QuestionId::new(*i)).collect()
    }

    fn build_session() -> ExamSession {
        ExamSession::new(
            SessionId::random(),
            StudentId::new(1),
            ExamId::new(2),
            order(&[3, 1, 2]),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn new_session_is_active() {
        let session = build_session();
        assert!(session.is_active());
        assert_eq!(session.completed_at(), None);
        assert_eq!(session.question_count(), 3);
        assert_eq!(session.shuffled_order(), &order(&[3, 1, 2])[..]);
    }

    #[test]
    fn rejects_empty_order() {
        let err = ExamSession::new(
            SessionId::random(),
            StudentId::new(1),
            ExamId::new(2),
            Vec::new(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::EmptyOrder);
    }

    #[test]
    fn rejects_duplicate_question_in_order() {
        let err = ExamSession::new(
            SessionId::random(),
            StudentId::new(1),
            ExamId::new(2),
            order(&[1, 2, 1]),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn complete_transitions_exactly_once() {
        let mut session = build_session();
        let finish = fixed_now() + Duration::minutes(30);

        session.complete(finish).unwrap();
        assert!(!session.is_active());
        assert_eq!(session.completed_at(), Some(finish));

        let err = session.complete(finish + Duration::minutes(1)).unwrap_err();
        assert_eq!(err, SessionStateError::AlreadyCompleted);
        assert_eq!(session.completed_at(), Some(finish));
    }

    #[test]
    fn complete_rejects_backdated_timestamp() {
        let mut session = build_session();
        let err = session
            .complete(fixed_now() - Duration::minutes(1))
            .unwrap_err();
        assert_eq!(err, SessionStateError::InvalidTimeRange);
        assert!(session.is_active());
    }

    #[test]
    fn from_persisted_rejects_inverted_time_range() {
        let err = ExamSession::from_persisted(
            SessionId::random(),
            StudentId::new(1),
            ExamId::new(2),
            order(&[1, 2]),
            fixed_now(),
            Some(fixed_now() - Duration::seconds(1)),
        )
        .unwrap_err();
        assert_eq!(err, SessionStateError::InvalidTimeRange);
    }

    #[test]
    fn belongs_to_matches_pair() {
        let session = build_session();
        assert!(session.belongs_to(StudentId::new(1), ExamId::new(2)));
        assert!(!session.belongs_to(StudentId::new(2), ExamId::new(2)));
        assert!(!session.belongs_to(StudentId::new(1), ExamId::new(3)));
    }
}
