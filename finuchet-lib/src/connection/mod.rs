mod handlers;

pub mod bank;
pub mod encryption;

use actix_web::{web, Scope};
use chrono::{DateTime, Utc};
use finuchet_repo::connection_repo::{ApiConnection, Provider};
use finuchet_repo::user_repo::UserId;
use serde::Serialize;

pub fn connection_service() -> Scope {
    web::scope("/connections")
        .service(handlers::get_connections)
        .service(handlers::create_connection)
        .service(handlers::get_connection)
        .service(handlers::update_connection)
        .service(handlers::delete_connection)
        .service(handlers::sync_connection)
}

/// An [ApiConnection] without its key material
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub provider: Provider,
    pub base_url: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApiConnection> for ConnectionView {
    fn from(connection: ApiConnection) -> Self {
        ConnectionView {
            id: connection.id,
            user_id: connection.user_id,
            name: connection.name,
            provider: connection.provider,
            base_url: connection.base_url,
            is_active: connection.is_active,
            last_sync_at: connection.last_sync_at,
            created_at: connection.created_at,
            updated_at: connection.updated_at,
        }
    }
}
