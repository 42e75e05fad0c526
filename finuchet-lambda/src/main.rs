use actix_web::App;
use finuchet_lib::config::Config;
use finuchet_lib::connection::encryption::KeyCipher;
use finuchet_lib::AppState;
use finuchet_repo::Repos;
use lambda_web::{run_actix_on_lambda, LambdaError};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;

const SERVICE_NAME: &str = "finuchet-lambda";

#[actix_web::main]
async fn main() -> Result<(), LambdaError> {
    let fmt_layer = || tracing_subscriber::fmt::Layer::default().with_ansi(false);
    let subscriber = registry::Registry::default()
        .with(LevelFilter::INFO)
        .with(fmt_layer());
    let tracing_guard = tracing::subscriber::set_default(subscriber);
    info!("tracing initialized");

    let config = Config::from_env()?;

    match &config.honeycomb_api_key {
        Some(api_key) => {
            let telemetry_layer =
                finuchet_lib::tracing::create_opentelemetry_layer(SERVICE_NAME, api_key)?;
            let subscriber = registry::Registry::default()
                .with(LevelFilter::INFO)
                .with(fmt_layer())
                .with(telemetry_layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = registry::Registry::default()
                .with(LevelFilter::INFO)
                .with(fmt_layer());
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    drop(tracing_guard);

    let repos: Repos = match &config.database_url {
        Some(database_url) => finuchet_repo::sqlx_repo::create_repos(database_url, 1).await?,
        None => {
            warn!("DATABASE_URL not set, records are kept in memory");
            finuchet_repo::mem_repo::create_repos()
        }
    };

    let store = Arc::new(finuchet_lib::build_tiered_store(&config.storage)?);
    store.probe_all().await?;

    let cipher = match &config.encryption_key {
        Some(key) => KeyCipher::from_base64(key)?,
        None => {
            warn!("ENCRYPTION_KEY not set, stored API keys will not survive a cold start");
            KeyCipher::new(&KeyCipher::generate_key())?
        }
    };
    let state = AppState::new(repos, store, cipher, &config)?;

    let factory = move || {
        App::new()
            .wrap(finuchet_lib::tracing::create_middleware())
            .configure(finuchet_lib::app_config_func(state.clone()))
    };
    run_actix_on_lambda(factory).await?;
    Ok(())
}
