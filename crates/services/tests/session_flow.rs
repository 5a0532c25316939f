use std::sync::Arc;

use exam_core::answers::Answer;
use exam_core::auth::AuthenticatedStudent;
use exam_core::model::{Exam, ExamId, Question, QuestionId, StudentId};
use exam_core::time::fixed_clock;
use services::{ExamSessionService, SessionServiceError, StartKind, StartedSession};
use storage::repository::{ExamRepository, Storage};

fn build_exam(id: u64, question_count: u64) -> Exam {
    let questions = (1..=question_count)
        .map(|qid| {
            Question::new(
                QuestionId::new(qid),
                format!("Question {qid}"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                (qid % 4) as usize,
            )
            .unwrap()
        })
        .collect();
    Exam::new(ExamId::new(id), format!("Exam {id}"), 45, questions).unwrap()
}

async fn service_with_exam(exam: &Exam) -> ExamSessionService {
    let storage = Storage::in_memory();
    storage.exams.upsert_exam(exam).await.unwrap();
    ExamSessionService::new(storage).with_clock(fixed_clock())
}

/// Builds positional answers for the started session: the correct option
/// for every question except the first `wrong` positions, which select a
/// deliberately incorrect option.
fn answers_with_wrong(exam: &Exam, started: &StartedSession, wrong: usize) -> Vec<Answer> {
    started
        .questions
        .iter()
        .enumerate()
        .map(|(position, view)| {
            let question = exam.question(view.id).expect("question exists");
            if position < wrong {
                Answer::Selected((question.correct() + 1) % question.options().len())
            } else {
                Answer::Selected(question.correct())
            }
        })
        .collect()
}

#[tokio::test]
async fn perfect_submission_scores_one_hundred() {
    let exam = build_exam(1, 5);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let answers = answers_with_wrong(&exam, &started, 0);

    let score = service
        .submit_session(started.session_id, &student, exam.id(), &answers)
        .await
        .unwrap();

    assert_eq!(score.value(), 100.0);
    assert!(service.has_scored(&student, exam.id()).await.unwrap());
}

#[tokio::test]
async fn blank_submission_scores_zero() {
    let exam = build_exam(1, 3);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let answers = vec![Answer::Unanswered; started.questions.len()];

    let score = service
        .submit_session(started.session_id, &student, exam.id(), &answers)
        .await
        .unwrap();

    assert_eq!(score.value(), 0.0);
}

#[tokio::test]
async fn three_of_four_scores_seventy_five() {
    let exam = build_exam(1, 4);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let answers = answers_with_wrong(&exam, &started, 1);

    let score = service
        .submit_session(started.session_id, &student, exam.id(), &answers)
        .await
        .unwrap();

    assert_eq!(score.value(), 75.0);
}

#[tokio::test]
async fn resubmission_fails_and_keeps_the_first_score() {
    let exam = build_exam(1, 4);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let first = service
        .submit_session(
            started.session_id,
            &student,
            exam.id(),
            &answers_with_wrong(&exam, &started, 0),
        )
        .await
        .unwrap();
    assert_eq!(first.value(), 100.0);

    let err = service
        .submit_session(
            started.session_id,
            &student,
            exam.id(),
            &answers_with_wrong(&exam, &started, 4),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SessionServiceError::AlreadyCompleted(_)));

    let scores = service.scores_for_exam(exam.id()).await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].value(), 100.0);
}

#[tokio::test]
async fn answer_count_mismatch_is_rejected() {
    let exam = build_exam(1, 4);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let err = service
        .submit_session(
            started.session_id,
            &student,
            exam.id(),
            &[Answer::Selected(0)],
        )
        .await
        .unwrap_err();

    match err {
        SessionServiceError::AnswerCount(mismatch) => {
            assert_eq!(mismatch.expected, 4);
            assert_eq!(mismatch.got, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn another_student_cannot_submit_into_the_session() {
    let exam = build_exam(1, 3);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));
    let intruder = AuthenticatedStudent::attest(StudentId::new(2));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let answers = answers_with_wrong(&exam, &started, 0);

    let err = service
        .submit_session(started.session_id, &intruder, exam.id(), &answers)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionServiceError::SessionMismatch(_)));

    // The rightful owner can still finish.
    service
        .submit_session(started.session_id, &student, exam.id(), &answers)
        .await
        .unwrap();
}

#[tokio::test]
async fn submit_with_wrong_exam_id_is_a_mismatch() {
    let exam = build_exam(1, 3);
    let other_exam = build_exam(2, 3);
    let storage = Storage::in_memory();
    storage.exams.upsert_exam(&exam).await.unwrap();
    storage.exams.upsert_exam(&other_exam).await.unwrap();
    let service = ExamSessionService::new(storage).with_clock(fixed_clock());
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let answers = answers_with_wrong(&exam, &started, 0);

    let err = service
        .submit_session(started.session_id, &student, other_exam.id(), &answers)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionServiceError::SessionMismatch(_)));
}

#[tokio::test]
async fn starting_a_scored_exam_is_rejected() {
    let exam = build_exam(1, 3);
    let service = service_with_exam(&exam).await;
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    service
        .submit_session(
            started.session_id,
            &student,
            exam.id(),
            &answers_with_wrong(&exam, &started, 0),
        )
        .await
        .unwrap();

    let err = service.start_session(&student, exam.id()).await.unwrap_err();
    assert!(matches!(err, SessionServiceError::AlreadyScored { .. }));
}

#[tokio::test]
async fn concurrent_starts_share_one_session() {
    let exam = build_exam(1, 6);
    let service = Arc::new(service_with_exam(&exam).await);
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.start_session(&student, ExamId::new(1)).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    let created = results
        .iter()
        .filter(|r| r.kind == StartKind::Created)
        .count();
    assert_eq!(created, 1);

    let first = &results[0];
    for result in &results {
        assert_eq!(result.session_id, first.session_id);
        assert_eq!(result.questions, first.questions);
    }
}

#[tokio::test]
async fn concurrent_submits_record_exactly_one_score() {
    let exam = build_exam(1, 4);
    let service = Arc::new(service_with_exam(&exam).await);
    let student = AuthenticatedStudent::attest(StudentId::new(1));

    let started = service.start_session(&student, exam.id()).await.unwrap();
    let answers = answers_with_wrong(&exam, &started, 0);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let answers = answers.clone();
        let session_id = started.session_id;
        handles.push(tokio::spawn(async move {
            service
                .submit_session(session_id, &student, ExamId::new(1), &answers)
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(score) => {
                wins += 1;
                assert_eq!(score.value(), 100.0);
            }
            Err(SessionServiceError::AlreadyCompleted(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);

    let scores = service.scores_for_exam(exam.id()).await.unwrap();
    assert_eq!(scores.len(), 1);
}
