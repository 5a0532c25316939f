use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ExamId, ScoreId, StudentId};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score value must be a finite number in [0, 100], got {value}")]
    OutOfRange { value: f64 },
}

/// A student's final result for one exam, created exactly once as the side
/// effect of completing a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    id: ScoreId,
    student_id: StudentId,
    exam_id: ExamId,
    value: f64,
    created_at: DateTime<Utc>,
}

impl Score {
    /// Creates a new score.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` unless `value` is finite and within
    /// [0, 100].
    pub fn new(
        id: ScoreId,
        student_id: StudentId,
        exam_id: ExamId,
        value: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ScoreError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ScoreError::OutOfRange { value });
        }

        Ok(Self {
            id,
            student_id,
            exam_id,
            value,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ScoreId {
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

    /// Percentage value in [0, 100].
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
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
    fn score_accepts_boundaries() {
        for value in [0.0, 75.0, 100.0] {
            let score = Score::new(
                ScoreId::random(),
                StudentId::new(1),
                ExamId::new(2),
                value,
                fixed_now(),
            )
            .unwrap();
            assert_eq!(score.value(), value);
        }
    }

    #[test]
    fn score_rejects_out_of_range() {
        for value in [-0.1, 100.1, f64::NAN, f64::INFINITY] {
            let err = Score::new(
                ScoreId::random(),
                StudentId::new(1),
                ExamId::new(2),
                value,
                fixed_now(),
            )
            .unwrap_err();
            assert!(matches!(err, ScoreError::OutOfRange { .. }));
        }
    }
}
