use std::path::PathBuf;

use thiserror::Error;

use crate::models::ClassId;

#[derive(Debug, Error, PartialEq)]
pub enum RosterError {
    #[error("unknown letter grade: {0:?}")]
    InvalidGrade(String),
    #[error("unknown course track: {0:?}")]
    InvalidTrack(String),
    #[error("credits must be a non-negative number, got {0:?}")]
    InvalidCredits(String),
    #[error("marking period 1 cannot be deleted, only cleared")]
    CannotDeleteFirstPeriod,
    #[error("marking period {0} does not exist")]
    PeriodNotFound(u32),
    #[error("class {0} does not exist")]
    ClassNotFound(ClassId),
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username {0:?} has already been taken")]
    UsernameTaken(String),
    #[error("username {0:?} not found")]
    NotFound(String),
    #[error("incorrect password")]
    WrongPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("{0}")]
    InvalidCredentials(&'static str),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot {id} not found for user {user_id:?}")]
    NotFound { user_id: String, id: i64 },
    #[error("storage failure: {0}")]
    DuplicateOrIo(#[from] sqlx::Error),
    #[error("migration failure: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
