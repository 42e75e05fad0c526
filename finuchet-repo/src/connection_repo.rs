use crate::user_repo::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Sberbank,
    Tinkoff,
    Alfabank,
    Vtb,
    Custom,
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Sberbank => f.write_str("sberbank"),
            Provider::Tinkoff => f.write_str("tinkoff"),
            Provider::Alfabank => f.write_str("alfabank"),
            Provider::Vtb => f.write_str("vtb"),
            Provider::Custom => f.write_str("custom"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sberbank" => Ok(Provider::Sberbank),
            "tinkoff" => Ok(Provider::Tinkoff),
            "alfabank" => Ok(Provider::Alfabank),
            "vtb" => Ok(Provider::Vtb),
            "custom" => Ok(Provider::Custom),
            _ => Err(anyhow::anyhow!("Unknown provider {}", s)),
        }
    }
}

/// A bank API connection. `api_key` and `api_secret` hold ciphertext, never plain key material.
#[derive(Clone, PartialEq, Debug)]
pub struct ApiConnection {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub provider: Provider,
    pub api_key: String,
    pub api_secret: Option<String>,
    pub base_url: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewConnection {
    pub name: String,
    pub provider: Provider,
    pub api_key: String,
    pub api_secret: Option<String>,
    pub base_url: Option<String>,
}

impl NewConnection {
    pub fn into_connection(self, id: String, user_id: UserId, now: DateTime<Utc>) -> ApiConnection {
        ApiConnection {
            id,
            user_id,
            name: self.name,
            provider: self.provider,
            api_key: self.api_key,
            api_secret: self.api_secret,
            base_url: self.base_url,
            is_active: true,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConnectionRepoError {
    #[error("Connection with id {0} not found")]
    ConnectionNotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait ConnectionRepo: Sync + Send {
    async fn get_connection(&self, connection_id: &str)
        -> Result<ApiConnection, ConnectionRepoError>;

    /// Connections of the user, newest first
    async fn get_connections(&self, user_id: &str)
        -> Result<Vec<ApiConnection>, ConnectionRepoError>;

    async fn create_connection(
        &self,
        user_id: &str,
        new_connection: NewConnection,
    ) -> Result<ApiConnection, ConnectionRepoError>;

    async fn update_connection(
        &self,
        connection_id: &str,
        name: &str,
        is_active: Option<bool>,
    ) -> Result<ApiConnection, ConnectionRepoError>;

    async fn set_last_sync(
        &self,
        connection_id: &str,
        last_sync_at: DateTime<Utc>,
    ) -> Result<(), ConnectionRepoError>;

    async fn delete_connection(&self, connection_id: &str) -> Result<(), ConnectionRepoError>;

    async fn delete_user_connections(&self, user_id: &str) -> Result<(), ConnectionRepoError>;
}
