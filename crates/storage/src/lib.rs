#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ExamRepository, InMemoryRepository, ScoreRepository, SessionRepository, StartOutcome, Storage,
    StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
