#![forbid(unsafe_code)]

pub mod error;
pub mod session_service;

pub use exam_core::Clock;

pub use error::SessionServiceError;
pub use session_service::{
    ExamInfo, ExamSessionService, QuestionView, StartKind, StartedSession,
};
