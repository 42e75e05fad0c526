use crate::kv::StoreError;
use crate::user_repo::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Error, Debug)]
pub enum SessionRepoError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("Session expired")]
    SessionExpired,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait SessionRepo: Sync + Send {
    async fn create_session(&self, user_id: &str, ttl: Duration)
        -> Result<Session, SessionRepoError>;

    /// Fails with [SessionRepoError::SessionExpired] once `expires_at` has passed
    async fn get_session(&self, session_id: &str) -> Result<Session, SessionRepoError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), SessionRepoError>;

    async fn delete_user_sessions(&self, user_id: &str) -> Result<(), SessionRepoError>;
}
