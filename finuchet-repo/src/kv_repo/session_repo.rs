use crate::kv::TieredStore;
use crate::session_repo::{Session, SessionRepo, SessionRepoError};
use anyhow::anyhow;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const SESSION_PREFIX: &str = "session:";
const USER_SESSIONS_PREFIX: &str = "user-sessions:";

/// Sessions live in the tiered store as `session:{id}`. Every session also gets an index key
/// `user-sessions:{user id}:{session id}`, so a user's sessions can be listed by prefix without
/// rewriting a shared list.
pub struct KvSessionRepo {
    store: Arc<TieredStore>,
}

impl KvSessionRepo {
    pub fn new(store: Arc<TieredStore>) -> KvSessionRepo {
        KvSessionRepo { store }
    }

    async fn user_sessions(&self, user_id: &str) -> Result<Vec<String>, SessionRepoError> {
        let prefix = user_sessions_prefix(user_id);
        Ok(self
            .store
            .keys(&prefix)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_owned))
            .collect())
    }
}

fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

fn user_sessions_prefix(user_id: &str) -> String {
    format!("{}{}:", USER_SESSIONS_PREFIX, user_id)
}

fn index_key(user_id: &str, session_id: &str) -> String {
    format!("{}{}", user_sessions_prefix(user_id), session_id)
}

fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[async_trait]
impl SessionRepo for KvSessionRepo {
    #[instrument(skip(self))]
    async fn create_session(
        &self,
        user_id: &str,
        ttl: Duration,
    ) -> Result<Session, SessionRepoError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow!("Session lifetime of {} is out of range", ttl))?;
        let session = Session {
            id: generate_session_id(),
            user_id: user_id.to_owned(),
            created_at: now,
            expires_at,
        };
        self.store
            .set_json(&index_key(user_id, &session.id), &session.expires_at)
            .await?;
        self.store
            .set_json(&session_key(&session.id), &session)
            .await?;

        debug!(%user_id, "Created session");
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> Result<Session, SessionRepoError> {
        let session: Session = self
            .store
            .get_json(&session_key(session_id))
            .await?
            .ok_or(SessionRepoError::SessionNotFound)?;

        if session.is_expired(Utc::now()) {
            if let Err(e) = self.delete_session(session_id).await {
                warn!(error = %e, "Unable to remove expired session");
            }
            return Err(SessionRepoError::SessionExpired);
        }
        Ok(session)
    }

    #[instrument(skip(self, session_id))]
    async fn delete_session(&self, session_id: &str) -> Result<(), SessionRepoError> {
        let session: Option<Session> = self.store.get_json(&session_key(session_id)).await?;
        self.store.delete(&session_key(session_id)).await?;

        if let Some(session) = session {
            self.store
                .delete(&index_key(&session.user_id, session_id))
                .await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user_sessions(&self, user_id: &str) -> Result<(), SessionRepoError> {
        for session_id in self.user_sessions(user_id).await? {
            self.store.delete(&session_key(&session_id)).await?;
            self.store.delete(&index_key(user_id, &session_id)).await?;
        }
        Ok(())
    }
}
