#![forbid(unsafe_code)]

pub mod answers;
pub mod auth;
pub mod error;
pub mod model;
pub mod scoring;
pub mod shuffle;
pub mod time;

pub use time::Clock;

pub use answers::{Answer, AnswerCountMismatch, AnswerError, MappedAnswer, map_answers};
pub use auth::AuthenticatedStudent;
pub use error::Error;
pub use scoring::{ScoreBreakdown, score_answers};
pub use shuffle::{shuffle_question_ids, shuffled_order};
