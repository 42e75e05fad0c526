#[macro_use]
extern crate actix_web;

pub mod auth;
pub mod budget;
pub mod category;
pub mod config;
pub mod connection;
pub mod csv;
pub mod error;
pub mod goal;
pub mod params;
pub mod storage;
pub mod summary;
pub mod tracing;
pub mod transaction;
pub mod user;

use crate::config::{Config, SeedConfig, SessionConfig, StorageConfig};
use crate::connection::bank::BankClient;
use crate::connection::encryption::KeyCipher;
use actix_web::error::JsonPayloadError;
use actix_web::web::Data;
use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use finuchet_repo::csv_repo::CsvRepo;
use finuchet_repo::kv::{FileStore, KeyValueStore, MemStore, RemoteConfigStore, TierPolicy, TieredStore};
use finuchet_repo::session_repo::SessionRepo;
use finuchet_repo::{kv_repo, Repos};
use std::sync::Arc;
use std::time::Duration;

const BANK_API_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the handlers take from the app data
#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub session_repo: Arc<dyn SessionRepo>,
    pub csv_repo: Arc<dyn CsvRepo>,
    pub store: Arc<TieredStore>,
    pub cipher: KeyCipher,
    pub bank_client: BankClient,
    pub session_config: SessionConfig,
    pub seed: Option<SeedConfig>,
    pub signups_enabled: bool,
}

impl AppState {
    /// Sessions and CSV statements live on `store`, everything else in `repos`
    pub fn new(
        repos: Repos,
        store: Arc<TieredStore>,
        cipher: KeyCipher,
        config: &Config,
    ) -> Result<AppState, anyhow::Error> {
        let (session_repo, csv_repo) = kv_repo::create_repos(store.clone());
        Ok(AppState {
            repos,
            session_repo,
            csv_repo,
            store,
            cipher,
            bank_client: BankClient::new(BANK_API_TIMEOUT)?,
            session_config: config.session.clone(),
            seed: config.seed.clone(),
            signups_enabled: config.signups_enabled,
        })
    }
}

/// Answers malformed JSON bodies with a 400 instead of actix's plain text error
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        ::tracing::error!(req_path = req.path(), %err);
        match err {
            JsonPayloadError::Deserialize(deserialize_err) => {
                let error_body = serde_json::json!({
                    "error": "Unable to parse JSON payload",
                    "detail": format!("{}", deserialize_err),
                });
                actix_web::error::InternalError::from_response(
                    deserialize_err,
                    HttpResponse::BadRequest()
                        .content_type("application/json")
                        .body(error_body.to_string()),
                )
                .into()
            }
            _ => err.into(),
        }
    })
}

pub fn app_config_func(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let session_auth = HttpAuthentication::with_fn(auth::session_validator);
        let repos = state.repos;

        cfg.app_data(json_config())
            .app_data(Data::new(repos.user_repo))
            .app_data(Data::new(repos.category_repo))
            .app_data(Data::new(repos.budget_repo))
            .app_data(Data::new(repos.goal_repo))
            .app_data(Data::new(repos.connection_repo))
            .app_data(Data::new(repos.transaction_repo))
            .app_data(Data::new(repos.health_check))
            .app_data(Data::new(state.session_repo))
            .app_data(Data::new(state.csv_repo))
            .app_data(Data::new(state.store))
            .app_data(Data::new(state.cipher))
            .app_data(Data::new(state.bank_client))
            .app_data(Data::new(state.session_config))
            .app_data(Data::new(state.seed))
            .service(
                web::scope("/api")
                    .service(auth::auth_service(state.signups_enabled))
                    .service(storage::storage_status_service())
                    .service(storage::health_service())
                    .service(storage::seed_service())
                    .service(csv::demo_service())
                    .service(user::profile_service().wrap(session_auth.clone()))
                    .service(user::users_service().wrap(session_auth.clone()))
                    .service(category::category_service().wrap(session_auth.clone()))
                    .service(budget::budget_service().wrap(session_auth.clone()))
                    .service(goal::goal_service().wrap(session_auth.clone()))
                    .service(connection::connection_service().wrap(session_auth.clone()))
                    .service(transaction::transaction_service().wrap(session_auth.clone()))
                    .service(transaction::report_service().wrap(session_auth.clone()))
                    .service(csv::csv_service().wrap(session_auth)),
            );
    }
}

/// Remote tier first when configured, then memory, then the local file when configured
pub fn build_tiered_store(config: &StorageConfig) -> Result<TieredStore, anyhow::Error> {
    let mut stores: Vec<Arc<dyn KeyValueStore>> = Vec::new();

    if let Some(remote) = &config.remote {
        let mut store = RemoteConfigStore::from_connection_string(
            &remote.connection_string,
            remote.api_token.clone().unwrap_or_default(),
            Duration::from_secs(config.timeout_secs),
        )?;
        if let Some(api_base) = &remote.api_base {
            store = store.with_api_base(api_base);
        }
        stores.push(Arc::new(store));
    }
    stores.push(Arc::new(MemStore::new()));
    if let Some(path) = &config.local_file {
        stores.push(Arc::new(FileStore::new(path.clone())));
    }

    Ok(TieredStore::new(
        stores,
        TierPolicy {
            write_mode: config.write_mode,
            backfill: config.backfill,
            retry_after: Duration::from_secs(config.retry_after_secs),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use finuchet_repo::kv::TierKind;

    #[actix_rt::test]
    async fn tier_order() {
        let config: Config = Config::from_toml(
            r#"
            [storage]
            local_file = "/tmp/finuchet-store.json"
            write_mode = "first-available"

            [storage.remote]
            connection_string = "https://edge-config.vercel.com/ecfg_1?token=read"
            "#,
        )
        .unwrap();
        let store = build_tiered_store(&config.storage).unwrap();
        let kinds: Vec<TierKind> = store.status().unwrap().into_iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![TierKind::Remote, TierKind::Memory, TierKind::LocalFile]
        );
    }

    #[actix_rt::test]
    async fn memory_only() {
        let store = build_tiered_store(&StorageConfig::default()).unwrap();
        assert_eq!(store.current_mode().unwrap(), Some(TierKind::Memory));
    }
}
