use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{Exam, ExamId, ExamSession, Score, SessionId, SessionStateError, StudentId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of the atomic check-then-create for a session start.
///
/// `Resumed` carries the already-active session for the (student, exam)
/// pair, shuffled order untouched; `Created` carries the candidate the
/// store just persisted. Callers that lose a start race receive the
/// winner's session as `Resumed` rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Created(ExamSession),
    Resumed(ExamSession),
}

impl StartOutcome {
    #[must_use]
    pub fn session(&self) -> &ExamSession {
        match self {
            Self::Created(session) | Self::Resumed(session) => session,
        }
    }

    #[must_use]
    pub fn into_session(self) -> ExamSession {
        match self {
            Self::Created(session) | Self::Resumed(session) => session,
        }
    }

    #[must_use]
    pub fn is_resumed(&self) -> bool {
        matches!(self, Self::Resumed(_))
    }
}

/// Repository contract for exams and their questions.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist or replace an exam with its full question set.
    ///
    /// Questions referenced by an in-progress session are immutable, so a
    /// rewrite is refused while any active session exists for the exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` while an active session references
    /// the exam, or other storage errors.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// Fetch an exam by ID with its current questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError>;
}

/// Repository contract for exam sessions. This is the single source of
/// truth for attempt state; no caller caches mutable session state.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Atomically return the active session for the candidate's
    /// (student, exam) pair, or persist the candidate as the new active
    /// session. Check and create happen as one operation; two concurrent
    /// calls for the same pair never both create.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the candidate is not active,
    /// or other storage errors.
    async fn start_session(&self, candidate: ExamSession) -> Result<StartOutcome, StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<ExamSession, StorageError>;

    /// Atomically mark the session completed and persist its score. The
    /// completion is conditional on the session still being active; losers
    /// of a submit race get `StorageError::Conflict` and no score is
    /// written. Completion flag and score commit as one unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session is missing,
    /// `StorageError::Conflict` if it is already completed or a score for
    /// the (student, exam) pair already exists, or other storage errors.
    async fn complete_with_score(
        &self,
        id: SessionId,
        completed_at: DateTime<Utc>,
        score: &Score,
    ) -> Result<(), StorageError>;
}

/// Read access to persisted scores. Scores are only ever written through
/// `SessionRepository::complete_with_score`.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Fetch the score for a (student, exam) pair, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn find_score(
        &self,
        student_id: StudentId,
        exam_id: ExamId,
    ) -> Result<Option<Score>, StorageError>;

    /// All scores recorded for an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn scores_for_exam(&self, exam_id: ExamId) -> Result<Vec<Score>, StorageError>;

    /// All scores recorded for a student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails.
    async fn scores_for_student(&self, student_id: StudentId) -> Result<Vec<Score>, StorageError>;
}

#[derive(Default)]
struct InMemoryState {
    exams: HashMap<ExamId, Exam>,
    sessions: HashMap<SessionId, ExamSession>,
    scores: HashMap<(StudentId, ExamId), Score>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All collections live behind one mutex, so check-then-create and
/// complete-plus-score are atomic exactly as the contracts require.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let in_progress = guard
            .sessions
            .values()
            .any(|s| s.exam_id() == exam.id() && s.is_active());
        if in_progress {
            return Err(StorageError::Conflict);
        }
        guard.exams.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError> {
        let guard = self.lock()?;
        guard.exams.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn start_session(&self, candidate: ExamSession) -> Result<StartOutcome, StorageError> {
        if !candidate.is_active() {
            return Err(StorageError::Conflict);
        }

        let mut guard = self.lock()?;
        let existing = guard
            .sessions
            .values()
            .find(|s| s.belongs_to(candidate.student_id(), candidate.exam_id()) && s.is_active())
            .cloned();
        if let Some(session) = existing {
            return Ok(StartOutcome::Resumed(session));
        }

        guard.sessions.insert(candidate.id(), candidate.clone());
        Ok(StartOutcome::Created(candidate))
    }

    async fn get_session(&self, id: SessionId) -> Result<ExamSession, StorageError> {
        let guard = self.lock()?;
        guard
            .sessions
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn complete_with_score(
        &self,
        id: SessionId,
        completed_at: DateTime<Utc>,
        score: &Score,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;

        let session = guard.sessions.get(&id).ok_or(StorageError::NotFound)?;
        if !session.belongs_to(score.student_id(), score.exam_id()) {
            return Err(StorageError::Serialization(
                "score does not match session".into(),
            ));
        }

        let mut completed = session.clone();
        completed.complete(completed_at).map_err(|e| match e {
            SessionStateError::AlreadyCompleted => StorageError::Conflict,
            other => StorageError::Serialization(other.to_string()),
        })?;

        let key = (score.student_id(), score.exam_id());
        if guard.scores.contains_key(&key) {
            return Err(StorageError::Conflict);
        }

        guard.sessions.insert(id, completed);
        guard.scores.insert(key, score.clone());
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn find_score(
        &self,
        student_id: StudentId,
        exam_id: ExamId,
    ) -> Result<Option<Score>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.scores.get(&(student_id, exam_id)).cloned())
    }

    async fn scores_for_exam(&self, exam_id: ExamId) -> Result<Vec<Score>, StorageError> {
        let guard = self.lock()?;
        let mut scores: Vec<Score> = guard
            .scores
            .values()
            .filter(|s| s.exam_id() == exam_id)
            .cloned()
            .collect();
        scores.sort_by_key(|s| (s.created_at(), s.id().value()));
        Ok(scores)
    }

    async fn scores_for_student(&self, student_id: StudentId) -> Result<Vec<Score>, StorageError> {
        let guard = self.lock()?;
        let mut scores: Vec<Score> = guard
            .scores
            .values()
            .filter(|s| s.student_id() == student_id)
            .cloned()
            .collect();
        scores.sort_by_key(|s| (s.created_at(), s.id().value()));
        Ok(scores)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self {
            exams,
            sessions,
            scores,
        }
    }
}
