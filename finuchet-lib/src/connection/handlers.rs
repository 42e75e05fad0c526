use crate::connection::bank::{BankClient, BankError, Credentials};
use crate::connection::encryption::KeyCipher;
use crate::connection::ConnectionView;
use crate::error::{ensure_owner, HandlerError};
use crate::user::UserId;
use actix_web::{web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use finuchet_repo::category_repo::CategoryRepo;
use finuchet_repo::connection_repo::{ApiConnection, ConnectionRepo, NewConnection, Provider};
use finuchet_repo::transaction_repo::{NewTransaction, TransactionRepo};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_SYNC_WINDOW_DAYS: i64 = 30;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: Option<String>,
}

/// `isActive` arrives as a JSON boolean or as the strings `"true"` / `"false"`
#[derive(Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn value(self) -> Result<bool, HandlerError> {
        match self {
            Flag::Bool(value) => Ok(value),
            Flag::Text(text) => match text.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(HandlerError::bad_request("isActive must be true or false")),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub is_active: Option<Flag>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

async fn owned_connection(
    connection_repo: &Arc<dyn ConnectionRepo>,
    connection_id: &str,
    user_id: &str,
) -> Result<ApiConnection, HandlerError> {
    let connection = connection_repo.get_connection(connection_id).await?;
    ensure_owner(&connection.user_id, user_id)?;
    Ok(connection)
}

#[get("")]
pub async fn get_connections(
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let connections: Vec<ConnectionView> = connection_repo
        .get_connections(&user_id.into_inner())
        .await?
        .into_iter()
        .map(ConnectionView::from)
        .collect();
    Ok(HttpResponse::Ok().json(connections))
}

#[post("")]
pub async fn create_connection(
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    cipher: web::Data<KeyCipher>,
    user_id: web::ReqData<UserId>,
    request: web::Json<ConnectionRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    let (Some(name), Some(provider), Some(api_key)) = (
        trimmed(request.name),
        trimmed(request.provider),
        trimmed(request.api_key),
    ) else {
        return Err(HandlerError::bad_request(
            "Name, provider and apiKey are required",
        ));
    };
    let provider: Provider = provider
        .to_lowercase()
        .parse()
        .map_err(|_| HandlerError::bad_request(format!("Unknown provider {}", provider)))?;

    let base_url = match provider {
        Provider::Custom => Some(
            trimmed(request.base_url)
                .ok_or_else(|| HandlerError::bad_request("baseUrl is required for custom providers"))?,
        ),
        _ => None,
    };
    let api_secret = trimmed(request.api_secret)
        .map(|secret| cipher.encrypt(&secret))
        .transpose()?;

    let connection = connection_repo
        .create_connection(
            &user_id.into_inner(),
            NewConnection {
                name,
                provider,
                api_key: cipher.encrypt(&api_key)?,
                api_secret,
                base_url,
            },
        )
        .await?;
    info!(connection_id = %connection.id, %provider, "Created API connection");
    Ok(HttpResponse::Ok().json(ConnectionView::from(connection)))
}

#[get("/{connection_id}")]
pub async fn get_connection(
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    user_id: web::ReqData<UserId>,
    connection_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let connection = owned_connection(&connection_repo, &connection_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(ConnectionView::from(connection)))
}

#[patch("/{connection_id}")]
pub async fn update_connection(
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    user_id: web::ReqData<UserId>,
    connection_id: web::Path<String>,
    patch: web::Json<ConnectionPatch>,
) -> Result<impl Responder, HandlerError> {
    let connection = owned_connection(&connection_repo, &connection_id, &user_id).await?;

    let patch = patch.into_inner();
    let name = trimmed(patch.name).ok_or_else(|| HandlerError::bad_request("Name is required"))?;
    let is_active = patch.is_active.map(Flag::value).transpose()?;

    let connection = connection_repo
        .update_connection(&connection.id, &name, is_active)
        .await?;
    Ok(HttpResponse::Ok().json(ConnectionView::from(connection)))
}

#[delete("/{connection_id}")]
pub async fn delete_connection(
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    user_id: web::ReqData<UserId>,
    connection_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let connection = owned_connection(&connection_repo, &connection_id, &user_id).await?;
    connection_repo.delete_connection(&connection.id).await?;
    info!(connection_id = %connection.id, "Deleted API connection");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Imports the transactions the bank reports since the last sync. Transactions already imported
/// through this connection are skipped.
#[post("/{connection_id}/sync")]
pub async fn sync_connection(
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    cipher: web::Data<KeyCipher>,
    bank_client: web::Data<BankClient>,
    user_id: web::ReqData<UserId>,
    connection_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let user_id = user_id.into_inner();
    let connection = owned_connection(&connection_repo, &connection_id, &user_id).await?;
    if !connection.is_active {
        return Err(HandlerError::bad_request("API connection is inactive"));
    }

    let api_key = cipher.decrypt(&connection.api_key)?;
    let credentials = Credentials {
        provider: connection.provider,
        api_key: &api_key,
        base_url: connection.base_url.as_deref(),
    };
    let now = Utc::now();
    let to = now.date_naive();
    let from = connection
        .last_sync_at
        .map(|last_sync_at| last_sync_at.date_naive())
        .unwrap_or(to - Duration::days(DEFAULT_SYNC_WINDOW_DAYS));

    let external = bank_client
        .fetch_transactions(&credentials, from, to)
        .await
        .map_err(|e| {
            warn!(connection_id = %connection.id, error = %e, "Bank sync failed");
            HandlerError::Upstream {
                message: "Failed to sync with bank API".to_owned(),
                details: match e {
                    BankError::Other(e) => format!("{:#}", e),
                    e => e.to_string(),
                },
            }
        })?;

    let mut synced = 0;
    for transaction in external {
        if transaction.amount.is_zero()
            || transaction_repo
                .external_transaction_exists(&connection.id, &transaction.external_id)
                .await?
        {
            continue;
        }

        let kind = transaction.kind();
        let category_id = match &transaction.category {
            Some(name) => category_repo
                .find_category(&user_id, name, kind)
                .await?
                .map(|category| category.id),
            None => None,
        };
        let new_transaction = NewTransaction::new(
            transaction.amount.abs(),
            kind,
            transaction.description,
            transaction.date,
            category_id,
        )
        .imported_from(&connection.id, transaction.external_id);
        transaction_repo
            .create_transaction(&user_id, new_transaction)
            .await?;
        synced += 1;
    }

    connection_repo.set_last_sync(&connection.id, now).await?;
    info!(connection_id = %connection.id, synced, "Synced API connection");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "syncedTransactions": synced,
        "message": format!("Imported {} new transactions", synced),
    })))
}
