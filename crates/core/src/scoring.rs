use crate::answers::MappedAnswer;
use crate::model::Exam;

/// Outcome of grading one submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub correct: usize,
    pub total: usize,
    pub value: f64,
}

/// Grades mapped answers against the exam's stored correct options.
///
/// An answer counts only when it selects exactly the stored correct index
/// of its canonical question; unanswered positions and answers whose
/// question id is not (or no longer) in the exam never count. The total is
/// the number of mapped answers, i.e. the question count captured at
/// session start. No partial credit, no negative marking.
#[must_use]
pub fn score_answers(mapped: &[MappedAnswer], exam: &Exam) -> ScoreBreakdown {
    let total = mapped.len();
    let correct = mapped
        .iter()
        .filter(|answer| {
            let Some(selected) = answer.answer.selected() else {
                return false;
            };
            exam.question(answer.question_id)
                .is_some_and(|q| q.is_correct(selected))
        })
        .count();

    let value = if total == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let ratio = correct as f64 / total as f64;
        ratio * 100.0
    };

    ScoreBreakdown {
        correct,
        total,
        value,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
