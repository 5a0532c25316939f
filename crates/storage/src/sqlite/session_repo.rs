use chrono::{DateTime, Utc};
use exam_core::model::{ExamSession, Score, SessionId};
use sqlx::Row;
use sqlx::error::DatabaseError;

use super::SqliteRepository;
use super::mapping::{encode_order, id_i64, map_session_row, ser};
use crate::repository::{SessionRepository, StartOutcome, StorageError};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn start_session(&self, candidate: ExamSession) -> Result<StartOutcome, StorageError> {
        if !candidate.is_active() {
            return Err(StorageError::Conflict);
        }

        let student_id = id_i64("student_id", candidate.student_id().value())?;
        let exam_id = id_i64("exam_id", candidate.exam_id().value())?;

        let insert = sqlx::query(
            r"
                INSERT INTO exam_sessions (id, student_id, exam_id, shuffled_order, started_at, completed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, NULL)
            ",
        )
        .bind(candidate.id().to_string())
        .bind(student_id)
        .bind(exam_id)
        .bind(encode_order(candidate.shuffled_order())?)
        .bind(candidate.started_at())
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => Ok(StartOutcome::Created(candidate)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // Lost the one-active-session race; the winner's row is the
                // session this student should continue with.
                tracing::debug!(
                    student_id,
                    exam_id,
                    "start race lost, resuming existing session"
                );
                let row = sqlx::query(
                    r"
                        SELECT id, student_id, exam_id, shuffled_order, started_at, completed_at
                        FROM exam_sessions
                        WHERE student_id = ?1 AND exam_id = ?2 AND completed_at IS NULL
                    ",
                )
                .bind(student_id)
                .bind(exam_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

                match row {
                    Some(row) => Ok(StartOutcome::Resumed(map_session_row(&row)?)),
                    // The winner completed before our re-read; surface the
                    // conflict and let the caller retry against fresh state.
                    None => Err(StorageError::Conflict),
                }
            }
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }

    async fn get_session(&self, id: SessionId) -> Result<ExamSession, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, student_id, exam_id, shuffled_order, started_at, completed_at
                FROM exam_sessions
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn complete_with_score(
        &self,
        id: SessionId,
        completed_at: DateTime<Utc>,
        score: &Score,
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let session_row = sqlx::query(
            r"
                SELECT student_id, exam_id FROM exam_sessions WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        let student_id: i64 = session_row.try_get("student_id").map_err(ser)?;
        let exam_id: i64 = session_row.try_get("exam_id").map_err(ser)?;
        if student_id != id_i64("student_id", score.student_id().value())?
            || exam_id != id_i64("exam_id", score.exam_id().value())?
        {
            return Err(StorageError::Serialization(
                "score does not match session".into(),
            ));
        }

        // The affected-row count of this conditional update decides the
        // race: zero rows means another submit already completed the
        // session, and the score insert below never runs.
        let updated = sqlx::query(
            r"
                UPDATE exam_sessions
                SET completed_at = ?1
                WHERE id = ?2 AND completed_at IS NULL
            ",
        )
        .bind(completed_at)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let insert = sqlx::query(
            r"
                INSERT INTO scores (id, student_id, exam_id, value, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(score.id().to_string())
        .bind(student_id)
        .bind(exam_id)
        .bind(score.value())
        .bind(score.created_at())
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // A score for this (student, exam) already exists; the whole
                // transaction rolls back, leaving the session active.
                return Err(StorageError::Conflict);
            }
            Err(e) => return Err(StorageError::Connection(e.to_string())),
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}
