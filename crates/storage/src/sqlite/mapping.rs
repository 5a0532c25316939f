use exam_core::model::{
    ExamId, ExamSession, QuestionId, Score, ScoreId, SessionId, StudentId,
};
use sqlx::Row;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn uuid_from_str(field: &'static str, s: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(s).map_err(|_| StorageError::Serialization(format!("invalid {field}: {s}")))
}

/// The shuffled order is stored as a JSON array of raw question ids.
pub(crate) fn encode_order(order: &[QuestionId]) -> Result<String, StorageError> {
    let raw: Vec<u64> = order.iter().map(QuestionId::value).collect();
    serde_json::to_string(&raw).map_err(ser)
}

pub(crate) fn decode_order(raw: &str) -> Result<Vec<QuestionId>, StorageError> {
    let ids: Vec<u64> = serde_json::from_str(raw).map_err(ser)?;
    Ok(ids.into_iter().map(QuestionId::new).collect())
}

/// Encodes option strings for the questions table.
pub(crate) fn encode_options(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn decode_options(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamSession, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let student_id: i64 = row.try_get("student_id").map_err(ser)?;
    let exam_id: i64 = row.try_get("exam_id").map_err(ser)?;
    let order: String = row.try_get("shuffled_order").map_err(ser)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    ExamSession::from_persisted(
        SessionId::new(uuid_from_str("session id", &id)?),
        student_id_from_i64(student_id)?,
        exam_id_from_i64(exam_id)?,
        decode_order(&order)?,
        started_at,
        completed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_score_row(row: &sqlx::sqlite::SqliteRow) -> Result<Score, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let student_id: i64 = row.try_get("student_id").map_err(ser)?;
    let exam_id: i64 = row.try_get("exam_id").map_err(ser)?;
    let value: f64 = row.try_get("value").map_err(ser)?;
    let created_at = row.try_get("created_at").map_err(ser)?;

    Score::new(
        ScoreId::new(uuid_from_str("score id", &id)?),
        student_id_from_i64(student_id)?,
        exam_id_from_i64(exam_id)?,
        value,
        created_at,
    )
    .map_err(ser)
}
