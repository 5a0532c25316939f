use serde::Serialize;

use exam_core::answers::{Answer, map_answers};
use exam_core::auth::AuthenticatedStudent;
use exam_core::model::{
    Exam, ExamId, ExamSession, Question, QuestionId, Score, ScoreId, SessionId,
};
use exam_core::scoring::score_answers;
use exam_core::shuffle::shuffled_order;
use exam_core::time::Clock;
use storage::repository::{
    ExamRepository, ScoreRepository, SessionRepository, Storage, StorageError,
};

use crate::error::SessionServiceError;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// A question as handed to the student taking the exam.
///
/// Deliberately omits the correct option index; correctness is consulted
/// server-side by the scoring engine only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
}

impl QuestionView {
    fn from_question(question: &Question) -> Self {
        Self {
            id: question.id(),
            text: question.text().to_owned(),
            options: question.options().to_vec(),
        }
    }
}

/// Exam metadata returned alongside the ordered questions. The duration is
/// surfaced for the caller's client-side timer; the engine imposes no
/// deadline of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamInfo {
    pub id: ExamId,
    pub title: String,
    pub duration_minutes: u32,
    pub question_count: usize,
}

impl ExamInfo {
    fn from_exam(exam: &Exam) -> Self {
        Self {
            id: exam.id(),
            title: exam.title().to_owned(),
            duration_minutes: exam.duration_minutes(),
            question_count: exam.question_count(),
        }
    }
}

/// Whether a start call created a fresh attempt or returned an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartKind {
    Created,
    Resumed,
}

/// Result of a start call: the attempt plus its questions in the
/// session-stable shuffled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedSession {
    pub session_id: SessionId,
    pub kind: StartKind,
    pub exam: ExamInfo,
    pub questions: Vec<QuestionView>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates exam attempts: creates or resumes sessions and turns a
/// single final submission into a locked score.
///
/// The session store is the single source of truth; this service holds no
/// mutable attempt state between calls.
pub struct ExamSessionService {
    storage: Storage,
    clock: Clock,
}

impl ExamSessionService {
    /// Create a new service over the given storage using the real-time clock.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            clock: Clock::default(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Start or resume the student's attempt at an exam.
    ///
    /// A first call shuffles the exam's question ids and persists a new
    /// active session; any later call while that session is active returns
    /// it with the identical order, so a page reload never reshuffles
    /// mid-attempt. Concurrent first calls are resolved by the store: one
    /// creates, the rest resume the winner.
    ///
    /// # Errors
    ///
    /// Returns `ExamNotFound`, `EmptyExam`, `AlreadyScored` (the student
    /// already finished this exam), `DataIntegrity` if the stored order
    /// references a removed question, or a storage error.
    pub async fn start_session(
        &self,
        student: &AuthenticatedStudent,
        exam_id: ExamId,
    ) -> Result<StartedSession, SessionServiceError> {
        let exam = match self.storage.exams.get_exam(exam_id).await {
            Ok(exam) => exam,
            Err(StorageError::NotFound) => return Err(SessionServiceError::ExamNotFound(exam_id)),
            Err(other) => return Err(other.into()),
        };
        if exam.is_empty() {
            return Err(SessionServiceError::EmptyExam(exam_id));
        }

        let student_id = student.student_id();
        if self
            .storage
            .scores
            .find_score(student_id, exam_id)
            .await?
            .is_some()
        {
            return Err(SessionServiceError::AlreadyScored {
                student_id,
                exam_id,
            });
        }

        let candidate = ExamSession::new(
            SessionId::random(),
            student_id,
            exam_id,
            shuffled_order(&exam.question_ids()),
            self.clock.now(),
        )?;

        let outcome = self.storage.sessions.start_session(candidate).await?;
        let kind = if outcome.is_resumed() {
            StartKind::Resumed
        } else {
            StartKind::Created
        };
        let session = outcome.into_session();
        if kind == StartKind::Resumed {
            tracing::debug!(session_id = %session.id(), %student_id, %exam_id, "resumed active session");
        }

        let questions = self.questions_in_order(&exam, &session)?;

        Ok(StartedSession {
            session_id: session.id(),
            kind,
            exam: ExamInfo::from_exam(&exam),
            questions,
        })
    }

    /// Submit the final answers for a session, producing its score.
    ///
    /// Answers are positional against the session's shuffled order and are
    /// remapped to canonical questions before grading. On success the
    /// session is completed and the score persisted as one atomic unit;
    /// any replay fails with `AlreadyCompleted` and never rescores.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `SessionMismatch` when the session does
    /// not belong to the claimed (student, exam) pair, `AlreadyCompleted`,
    /// `AnswerCountMismatch`, `InvalidAnswer` for an out-of-range option
    /// index, `DataIntegrity`, or a storage error.
    pub async fn submit_session(
        &self,
        session_id: SessionId,
        student: &AuthenticatedStudent,
        exam_id: ExamId,
        answers: &[Answer],
    ) -> Result<Score, SessionServiceError> {
        let session = match self.storage.sessions.get_session(session_id).await {
            Ok(session) => session,
            Err(StorageError::NotFound) => {
                return Err(SessionServiceError::SessionNotFound(session_id));
            }
            Err(other) => return Err(other.into()),
        };

        if !session.belongs_to(student.student_id(), exam_id) {
            return Err(SessionServiceError::SessionMismatch(session_id));
        }
        if !session.is_active() {
            return Err(SessionServiceError::AlreadyCompleted(session_id));
        }

        let mapped = map_answers(session.shuffled_order(), answers)?;

        let exam = match self.storage.exams.get_exam(exam_id).await {
            Ok(exam) => exam,
            Err(StorageError::NotFound) => return Err(SessionServiceError::ExamNotFound(exam_id)),
            Err(other) => return Err(other.into()),
        };

        for (position, answer) in mapped.iter().enumerate() {
            let question = exam
                .question(answer.question_id)
                .ok_or_else(|| self.integrity_error(&session, answer.question_id))?;
            if let Some(selected) = answer.answer.selected() {
                if selected >= question.options().len() {
                    return Err(SessionServiceError::InvalidAnswer {
                        position,
                        selected,
                        available: question.options().len(),
                    });
                }
            }
        }

        let breakdown = score_answers(&mapped, &exam);
        let completed_at = self.clock.now();
        let score = Score::new(
            ScoreId::random(),
            student.student_id(),
            exam_id,
            breakdown.value,
            completed_at,
        )?;

        match self
            .storage
            .sessions
            .complete_with_score(session_id, completed_at, &score)
            .await
        {
            Ok(()) => Ok(score),
            Err(StorageError::Conflict) => Err(SessionServiceError::AlreadyCompleted(session_id)),
            Err(StorageError::NotFound) => Err(SessionServiceError::SessionNotFound(session_id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Returns true if the student already has a score for the exam.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn has_scored(
        &self,
        student: &AuthenticatedStudent,
        exam_id: ExamId,
    ) -> Result<bool, SessionServiceError> {
        Ok(self
            .storage
            .scores
            .find_score(student.student_id(), exam_id)
            .await?
            .is_some())
    }

    /// All scores recorded for an exam.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn scores_for_exam(
        &self,
        exam_id: ExamId,
    ) -> Result<Vec<Score>, SessionServiceError> {
        Ok(self.storage.scores.scores_for_exam(exam_id).await?)
    }

    /// All scores recorded for the student.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub async fn scores_for_student(
        &self,
        student: &AuthenticatedStudent,
    ) -> Result<Vec<Score>, SessionServiceError> {
        Ok(self
            .storage
            .scores
            .scores_for_student(student.student_id())
            .await?)
    }

    /// Reorders the exam's questions by the session's shuffled order.
    fn questions_in_order(
        &self,
        exam: &Exam,
        session: &ExamSession,
    ) -> Result<Vec<QuestionView>, SessionServiceError> {
        session
            .shuffled_order()
            .iter()
            .map(|question_id| {
                exam.question(*question_id)
                    .map(QuestionView::from_question)
                    .ok_or_else(|| self.integrity_error(session, *question_id))
            })
            .collect()
    }

    fn integrity_error(
        &self,
        session: &ExamSession,
        question_id: QuestionId,
    ) -> SessionServiceError {
        tracing::error!(
            session_id = %session.id(),
            %question_id,
            "shuffled order references a question missing from the exam"
        );
        SessionServiceError::DataIntegrity {
            session_id: session.id(),
            question_id,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Question, StudentId};
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::SessionRepository;

    fn build_exam(id: u64, question_count: u64) -> Exam {
        let questions = (1..=question_count)
            .map(|qid| {
                Question::new(
                    QuestionId::new(qid),
                    format!("Question {qid}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    (qid % 3) as usize,
                )
                .unwrap()
            })
            .collect();
        Exam::new(ExamId::new(id), format!("Exam {id}"), 30, questions).unwrap()
    }

    async fn service_with_exam(exam: &Exam) -> ExamSessionService {
        let storage = Storage::in_memory();
        storage.exams.upsert_exam(exam).await.unwrap();
        ExamSessionService::new(storage).with_clock(fixed_clock())
    }

    #[tokio::test]
    async fn start_returns_questions_in_shuffled_order() {
        let exam = build_exam(1, 5);
        let service = service_with_exam(&exam).await;
        let student = AuthenticatedStudent::attest(StudentId::new(1));

        let started = service.start_session(&student, exam.id()).await.unwrap();

        assert_eq!(started.kind, StartKind::Created);
        assert_eq!(started.exam.question_count, 5);
        assert_eq!(started.questions.len(), 5);

        // Same questions, session-specific order.
        let mut ids: Vec<_> = started.questions.iter().map(|q| q.id).collect();
        ids.sort();
        assert_eq!(ids, exam.question_ids());
    }

    #[tokio::test]
    async fn start_for_missing_exam_fails() {
        let service = ExamSessionService::new(Storage::in_memory()).with_clock(fixed_clock());
        let student = AuthenticatedStudent::attest(StudentId::new(1));

        let err = service
            .start_session(&student, ExamId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionServiceError::ExamNotFound(_)));
    }

    #[tokio::test]
    async fn start_for_empty_exam_fails() {
        let exam = Exam::new(ExamId::new(1), "Empty", 30, Vec::new()).unwrap();
        let service = service_with_exam(&exam).await;
        let student = AuthenticatedStudent::attest(StudentId::new(1));

        let err = service.start_session(&student, exam.id()).await.unwrap_err();
        assert!(matches!(err, SessionServiceError::EmptyExam(_)));
    }

    #[tokio::test]
    async fn resumed_start_keeps_the_original_order() {
        let exam = build_exam(1, 6);
        let service = service_with_exam(&exam).await;
        let student = AuthenticatedStudent::attest(StudentId::new(1));

        let first = service.start_session(&student, exam.id()).await.unwrap();
        let second = service.start_session(&student, exam.id()).await.unwrap();

        assert_eq!(second.kind, StartKind::Resumed);
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.questions, first.questions);
    }

    #[tokio::test]
    async fn stale_order_is_a_data_integrity_error() {
        let exam = build_exam(1, 2);
        let storage = Storage::in_memory();
        storage.exams.upsert_exam(&exam).await.unwrap();

        // A session whose order references a question the exam never had.
        let session = ExamSession::new(
            SessionId::random(),
            StudentId::new(1),
            exam.id(),
            vec![QuestionId::new(1), QuestionId::new(99)],
            fixed_now(),
        )
        .unwrap();
        storage.sessions.start_session(session).await.unwrap();

        let service = ExamSessionService::new(storage).with_clock(fixed_clock());
        let student = AuthenticatedStudent::attest(StudentId::new(1));
        let err = service.start_session(&student, exam.id()).await.unwrap_err();
        assert!(matches!(err, SessionServiceError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn submit_rejects_out_of_range_option() {
        let exam = build_exam(1, 2);
        let service = service_with_exam(&exam).await;
        let student = AuthenticatedStudent::attest(StudentId::new(1));

        let started = service.start_session(&student, exam.id()).await.unwrap();
        let err = service
            .submit_session(
                started.session_id,
                &student,
                exam.id(),
                &[Answer::Selected(3), Answer::Unanswered],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SessionServiceError::InvalidAnswer {
                position: 0,
                selected: 3,
                available: 3
            }
        ));
    }
}
