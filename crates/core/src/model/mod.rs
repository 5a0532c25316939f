mod exam;
mod ids;
mod score;
mod session;

pub use ids::{ExamId, ParseIdError, QuestionId, ScoreId, SessionId, StudentId};

pub use exam::{Exam, ExamError, Question, QuestionError};
pub use score::{Score, ScoreError};
pub use session::{ExamSession, SessionStateError};
