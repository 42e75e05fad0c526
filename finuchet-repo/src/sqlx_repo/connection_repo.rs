use crate::connection_repo::{ApiConnection, ConnectionRepo, ConnectionRepoError, NewConnection};
use crate::sqlx_repo::SQLxRepo;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct ConnectionEntry {
    id: String,
    user_id: String,
    name: String,
    provider: String,
    api_key: String,
    api_secret: Option<String>,
    base_url: Option<String>,
    is_active: bool,
    last_sync_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConnectionEntry> for ApiConnection {
    type Error = anyhow::Error;

    fn try_from(value: ConnectionEntry) -> Result<Self, Self::Error> {
        Ok(ApiConnection {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            provider: value.provider.parse()?,
            api_key: value.api_key,
            api_secret: value.api_secret,
            base_url: value.base_url,
            is_active: value.is_active,
            last_sync_at: value.last_sync_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[async_trait]
impl ConnectionRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_connection(
        &self,
        connection_id: &str,
    ) -> Result<ApiConnection, ConnectionRepoError> {
        let entry: Option<ConnectionEntry> =
            query_as("SELECT * FROM api_connections WHERE id = $1")
                .bind(connection_id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to get connection {}", connection_id))?;
        let entry = entry
            .ok_or_else(|| ConnectionRepoError::ConnectionNotFound(connection_id.to_owned()))?;
        Ok(ApiConnection::try_from(entry)?)
    }

    #[instrument(skip(self))]
    async fn get_connections(
        &self,
        user_id: &str,
    ) -> Result<Vec<ApiConnection>, ConnectionRepoError> {
        let entries: Vec<ConnectionEntry> = query_as(
            "SELECT * FROM api_connections WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Unable to get connections for user {}", user_id))?;
        let connections = entries
            .into_iter()
            .map(ApiConnection::try_from)
            .collect::<Result<Vec<ApiConnection>, anyhow::Error>>()?;
        Ok(connections)
    }

    #[instrument(skip(self, new_connection))]
    async fn create_connection(
        &self,
        user_id: &str,
        new_connection: NewConnection,
    ) -> Result<ApiConnection, ConnectionRepoError> {
        let connection =
            new_connection.into_connection(crate::new_id(), user_id.to_owned(), Utc::now());
        query(
            "INSERT INTO api_connections(id, user_id, name, provider, api_key, api_secret, base_url, is_active, last_sync_at, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&connection.id)
        .bind(&connection.user_id)
        .bind(&connection.name)
        .bind(connection.provider.to_string())
        .bind(&connection.api_key)
        .bind(&connection.api_secret)
        .bind(&connection.base_url)
        .bind(connection.is_active)
        .bind(connection.last_sync_at)
        .bind(connection.created_at)
        .bind(connection.updated_at)
        .execute(&self.pool)
        .await
        .context("Unable to insert connection")?;
        Ok(connection)
    }

    #[instrument(skip(self))]
    async fn update_connection(
        &self,
        connection_id: &str,
        name: &str,
        is_active: Option<bool>,
    ) -> Result<ApiConnection, ConnectionRepoError> {
        let entry: Option<ConnectionEntry> = query_as(
            "UPDATE api_connections SET name = $1, is_active = COALESCE($2, is_active), updated_at = $3 WHERE id = $4 RETURNING *",
        )
        .bind(name)
        .bind(is_active)
        .bind(Utc::now())
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Unable to update connection {}", connection_id))?;
        let entry = entry
            .ok_or_else(|| ConnectionRepoError::ConnectionNotFound(connection_id.to_owned()))?;
        Ok(ApiConnection::try_from(entry)?)
    }

    #[instrument(skip(self))]
    async fn set_last_sync(
        &self,
        connection_id: &str,
        last_sync_at: DateTime<Utc>,
    ) -> Result<(), ConnectionRepoError> {
        let result =
            query("UPDATE api_connections SET last_sync_at = $1, updated_at = $1 WHERE id = $2")
                .bind(last_sync_at)
                .bind(connection_id)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Unable to update connection {}", connection_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(ConnectionRepoError::ConnectionNotFound(
                connection_id.to_owned(),
            ))
        }
    }

    #[instrument(skip(self))]
    async fn delete_connection(&self, connection_id: &str) -> Result<(), ConnectionRepoError> {
        let result = query("DELETE FROM api_connections WHERE id = $1")
            .bind(connection_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete connection {}", connection_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(ConnectionRepoError::ConnectionNotFound(
                connection_id.to_owned(),
            ))
        }
    }

    #[instrument(skip(self))]
    async fn delete_user_connections(&self, user_id: &str) -> Result<(), ConnectionRepoError> {
        query("DELETE FROM api_connections WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete connections of user {}", user_id))?;
        Ok(())
    }
}
