use exam_core::model::{Exam, ExamId, Question};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{decode_options, encode_options, id_i64, question_id_from_i64, ser};
use crate::repository::{ExamRepository, StorageError};

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let exam_id = id_i64("exam_id", exam.id().value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Questions referenced by an in-progress session are immutable;
        // rewriting them out from under an attempt is rejected outright.
        let active = sqlx::query(
            r"
                SELECT 1 FROM exam_sessions
                WHERE exam_id = ?1 AND completed_at IS NULL
                LIMIT 1
            ",
        )
        .bind(exam_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        if active.is_some() {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r"
                INSERT INTO exams (id, title, duration_minutes)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    duration_minutes = excluded.duration_minutes
            ",
        )
        .bind(exam_id)
        .bind(exam.title())
        .bind(i64::from(exam.duration_minutes()))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM questions WHERE exam_id = ?1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for question in exam.questions() {
            sqlx::query(
                r"
                    INSERT INTO questions (id, exam_id, text, options, correct_index)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(id_i64("question_id", question.id().value())?)
            .bind(exam_id)
            .bind(question.text())
            .bind(encode_options(question.options())?)
            .bind(id_i64("correct_index", question.correct() as u64)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError> {
        let exam_id = id_i64("exam_id", id.value())?;

        let exam_row = sqlx::query(
            r"
                SELECT title, duration_minutes FROM exams WHERE id = ?1
            ",
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        let question_rows = sqlx::query(
            r"
                SELECT id, text, options, correct_index
                FROM questions
                WHERE exam_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in question_rows {
            let question_id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
            let text: String = row.try_get("text").map_err(ser)?;
            let options = decode_options(&row.try_get::<String, _>("options").map_err(ser)?)?;
            let correct_i64: i64 = row.try_get("correct_index").map_err(ser)?;
            let correct = usize::try_from(correct_i64)
                .map_err(|_| StorageError::Serialization(format!("invalid correct_index: {correct_i64}")))?;

            questions.push(Question::new(question_id, text, options, correct).map_err(ser)?);
        }

        let title: String = exam_row.try_get("title").map_err(ser)?;
        let duration_i64: i64 = exam_row.try_get("duration_minutes").map_err(ser)?;
        let duration = u32::try_from(duration_i64)
            .map_err(|_| StorageError::Serialization(format!("invalid duration: {duration_i64}")))?;

        Exam::new(id, title, duration, questions).map_err(ser)
    }
}
