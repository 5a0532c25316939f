use exam_core::model::{ExamId, Score, StudentId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_score_row};
use crate::repository::{ScoreRepository, StorageError};

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    async fn find_score(
        &self,
        student_id: StudentId,
        exam_id: ExamId,
    ) -> Result<Option<Score>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, student_id, exam_id, value, created_at
                FROM scores
                WHERE student_id = ?1 AND exam_id = ?2
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("exam_id", exam_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_score_row).transpose()
    }

    async fn scores_for_exam(&self, exam_id: ExamId) -> Result<Vec<Score>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, student_id, exam_id, value, created_at
                FROM scores
                WHERE exam_id = ?1
                ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_i64("exam_id", exam_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut scores = Vec::with_capacity(rows.len());
        for row in rows {
            scores.push(map_score_row(&row)?);
        }
        Ok(scores)
    }

    async fn scores_for_student(&self, student_id: StudentId) -> Result<Vec<Score>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, student_id, exam_id, value, created_at
                FROM scores
                WHERE student_id = ?1
                ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut scores = Vec::with_capacity(rows.len());
        for row in rows {
            scores.push(map_score_row(&row)?);
        }
        Ok(scores)
    }
}
