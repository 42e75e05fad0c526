use crate::connection_repo::ConnectionRepoError::ConnectionNotFound;
use crate::connection_repo::{ApiConnection, ConnectionRepo, ConnectionRepoError, NewConnection};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemConnectionRepo {
    connections: RwLock<HashMap<String, ApiConnection>>,
}

impl MemConnectionRepo {
    pub fn new() -> MemConnectionRepo {
        MemConnectionRepo {
            connections: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, ApiConnection>>, anyhow::Error> {
        self.connections
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(
        &self,
    ) -> Result<RwLockWriteGuard<HashMap<String, ApiConnection>>, anyhow::Error> {
        self.connections
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl ConnectionRepo for MemConnectionRepo {
    async fn get_connection(
        &self,
        connection_id: &str,
    ) -> Result<ApiConnection, ConnectionRepoError> {
        self.read_lock()?
            .get(connection_id)
            .cloned()
            .ok_or_else(|| ConnectionNotFound(connection_id.to_owned()))
    }

    async fn get_connections(
        &self,
        user_id: &str,
    ) -> Result<Vec<ApiConnection>, ConnectionRepoError> {
        let mut connections: Vec<ApiConnection> = self
            .read_lock()?
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }

    async fn create_connection(
        &self,
        user_id: &str,
        new_connection: NewConnection,
    ) -> Result<ApiConnection, ConnectionRepoError> {
        let connection =
            new_connection.into_connection(crate::new_id(), user_id.to_owned(), Utc::now());
        self.write_lock()?
            .insert(connection.id.clone(), connection.clone());
        Ok(connection)
    }

    async fn update_connection(
        &self,
        connection_id: &str,
        name: &str,
        is_active: Option<bool>,
    ) -> Result<ApiConnection, ConnectionRepoError> {
        let mut write_guard = self.write_lock()?;

        let connection = write_guard
            .get_mut(connection_id)
            .ok_or_else(|| ConnectionNotFound(connection_id.to_owned()))?;
        connection.name = name.to_owned();
        if let Some(is_active) = is_active {
            connection.is_active = is_active;
        }
        connection.updated_at = Utc::now();
        Ok(connection.clone())
    }

    async fn set_last_sync(
        &self,
        connection_id: &str,
        last_sync_at: DateTime<Utc>,
    ) -> Result<(), ConnectionRepoError> {
        let mut write_guard = self.write_lock()?;

        let connection = write_guard
            .get_mut(connection_id)
            .ok_or_else(|| ConnectionNotFound(connection_id.to_owned()))?;
        connection.last_sync_at = Some(last_sync_at);
        connection.updated_at = last_sync_at;
        Ok(())
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), ConnectionRepoError> {
        self.write_lock()?
            .remove(connection_id)
            .map(|_| ())
            .ok_or_else(|| ConnectionNotFound(connection_id.to_owned()))
    }

    async fn delete_user_connections(&self, user_id: &str) -> Result<(), ConnectionRepoError> {
        self.write_lock()?.retain(|_, connection| connection.user_id != user_id);
        Ok(())
    }
}
