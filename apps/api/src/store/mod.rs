// Persistence seams: relational datastore, resume document storage, and the
// retry policy shared by every write.

pub mod documents;
pub mod postgres;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::application::{
    Application, ApplicationStatus, ApplicationStatusRow, NewApplication,
};
use crate::models::job::{Job, NewJob};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("referenced record does not exist: {0}")]
    ForeignKey(String),

    #[error("database schema is missing a table or column: {0}")]
    MissingSchema(String),

    #[error("transient datastore failure: {0}")]
    Transient(String),

    #[error("datastore call timed out after {0:?}")]
    Timeout(Duration),

    #[error("stored record is invalid: {0}")]
    Corrupt(String),

    #[error("datastore error: {0}")]
    Other(String),
}

impl StoreError {
    /// Network-level failures and timeouts; constraint errors never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::Timeout(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match db.code().as_deref() {
                    Some("23505") => StoreError::Duplicate(message),
                    Some("23503") => StoreError::ForeignKey(message),
                    Some("42P01") | Some("42703") => StoreError::MissingSchema(message),
                    // connection_exception class and serialization failures
                    Some(code) if code.starts_with("08") || code == "40001" => {
                        StoreError::Transient(message)
                    }
                    _ => StoreError::Other(message),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Transient(e.to_string()),
            other => StoreError::Other(other.to_string()),
        }
    }
}

/// Relational datastore used by the pipeline. Every write targets a single row
/// by primary key; the database's own row-level atomicity is sufficient.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn insert_job(&self, job: &NewJob) -> Result<Job, StoreError>;

    /// Re-inserting an id that already exists is a no-op, so a retry after a
    /// commit whose reply was lost succeeds.
    async fn insert_application(&self, application: &NewApplication) -> Result<(), StoreError>;

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, StoreError>;

    async fn find_status_by_tracking_token(
        &self,
        token: &str,
    ) -> Result<Option<ApplicationStatusRow>, StoreError>;

    /// Returns `false` when no application has this id.
    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool, StoreError>;

    /// Returns `false` when no application has this id.
    async fn record_test_result(
        &self,
        id: Uuid,
        test_score: u8,
        overall_score: Option<u8>,
    ) -> Result<bool, StoreError>;
}
