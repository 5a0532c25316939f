use rand::Rng;

use crate::model::QuestionId;

/// Returns a uniformly random permutation of `ids`.
///
/// Inside-out Fisher–Yates over a copy: for each index i from the end down
/// to 1, swap with a uniformly drawn j in [0, i]. Inputs of length 0 or 1
/// come back unchanged.
#[must_use]
pub fn shuffle_question_ids<R: Rng + ?Sized>(ids: &[QuestionId], rng: &mut R) -> Vec<QuestionId> {
    let mut shuffled = ids.to_vec();
    if shuffled.len() < 2 {
        return shuffled;
    }
    for i in (1..shuffled.len()).rev() {
        let j = rng.random_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

/// Shuffles with the thread-local generator.
#[must_use]
pub fn shuffled_order(ids: &[QuestionId]) -> Vec<QuestionId> {
    shuffle_question_ids(ids, &mut rand::rng())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
