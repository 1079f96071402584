//! Test sessions: a generated question set bound to an application, held in
//! Redis under the application's opaque test token until it is submitted.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::assessment::generator::McqQuestion;

const KEY_PREFIX: &str = "test_session:";
/// Sessions outlive their nominal duration so late starters can still open them.
pub const SESSION_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("session payload error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSession {
    pub application_id: Uuid,
    pub job_title: String,
    pub questions: Vec<McqQuestion>,
    pub duration_minutes: u32,
    pub passing_score: u8,
    pub created_at: DateTime<Utc>,
}

impl TestSession {
    /// How long the session stays retrievable.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_minutes) * 60) + SESSION_GRACE
    }
}

#[async_trait]
pub trait TestSessionStore: Send + Sync {
    async fn save(&self, token: &str, session: &TestSession, ttl: Duration)
        -> Result<(), SessionError>;

    /// Stores the session only if none exists under `token`. Returns `false`
    /// when one is already open.
    async fn open(&self, token: &str, session: &TestSession, ttl: Duration)
        -> Result<bool, SessionError>;

    async fn load(&self, token: &str) -> Result<Option<TestSession>, SessionError>;

    /// Atomically reads and deletes the session, so each test is submitted once.
    async fn take(&self, token: &str) -> Result<Option<TestSession>, SessionError>;
}

pub struct RedisSessionStore {
    client: RedisClient,
}

impl RedisSessionStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

fn session_key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

fn decode(payload: Option<String>) -> Result<Option<TestSession>, SessionError> {
    payload
        .map(|p| serde_json::from_str(&p))
        .transpose()
        .map_err(SessionError::from)
}

#[async_trait]
impl TestSessionStore for RedisSessionStore {
    async fn save(
        &self,
        token: &str,
        session: &TestSession,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let payload = serde_json::to_string(session)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(session_key(token))
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn open(
        &self,
        token: &str,
        session: &TestSession,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        let payload = serde_json::to_string(session)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SET NX replies OK when written and nil when the key exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(session_key(token))
            .arg(payload)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn load(&self, token: &str) -> Result<Option<TestSession>, SessionError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = redis::cmd("GET")
            .arg(session_key(token))
            .query_async(&mut conn)
            .await?;
        decode(payload)
    }

    async fn take(&self, token: &str) -> Result<Option<TestSession>, SessionError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = redis::cmd("GETDEL")
            .arg(session_key(token))
            .query_async(&mut conn)
            .await?;
        decode(payload)
    }
}
