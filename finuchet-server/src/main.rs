#[macro_use]
extern crate tracing;

use std::error::Error;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer};
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rustls::{Certificate, PrivateKey, ServerConfig};
use rustls_pemfile::{certs, pkcs8_private_keys};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;

use finuchet_lib::config::Config;
use finuchet_lib::connection::encryption::KeyCipher;
use finuchet_lib::AppState;
use finuchet_repo::Repos;

const SERVICE_NAME: &str = "finuchet-server";

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = registry::Registry::default()
        .with(LevelFilter::INFO)
        .with(tracing_subscriber::fmt::Layer::default());
    let tracing_guard = tracing::subscriber::set_default(subscriber);
    info!("tracing initialized");

    let config_path = get_config_file()?;
    let mut config: Config = Config::from_file(config_path)?;

    match &config.honeycomb_api_key {
        Some(api_key) => {
            let telemetry_layer =
                finuchet_lib::tracing::create_opentelemetry_layer(SERVICE_NAME, api_key)?;
            let subscriber = registry::Registry::default()
                .with(LevelFilter::INFO)
                .with(tracing_subscriber::fmt::Layer::default())
                .with(telemetry_layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = registry::Registry::default()
                .with(LevelFilter::INFO)
                .with(tracing_subscriber::fmt::Layer::default());
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    drop(tracing_guard);

    let repos: Repos = match &config.database_url {
        Some(database_url) => finuchet_repo::sqlx_repo::create_repos(database_url, 10).await?,
        None => {
            warn!("No database configured, records are kept in memory");
            finuchet_repo::mem_repo::create_repos()
        }
    };

    let state_dir = get_state_dir();
    if config.storage.local_file.is_none() {
        fs::create_dir_all(&state_dir)?;
        config.storage.local_file = Some(state_dir.join("storage.json"));
    }
    let store = Arc::new(finuchet_lib::build_tiered_store(&config.storage)?);
    for result in store.probe_all().await? {
        if result.success {
            info!(tier = %result.kind, "Storage tier available");
        } else {
            warn!(tier = %result.kind, error = ?result.error, "Storage tier unavailable");
        }
    }

    let cipher = match &config.encryption_key {
        Some(key) => KeyCipher::from_base64(key)?,
        None => KeyCipher::new(&get_encryption_key()?)?,
    };
    let state = AppState::new(repos, store, cipher, &config)?;
    let allowed_origins = config.allowed_origins.clone();

    let mut server = HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();
        App::new()
            .wrap(cors)
            .wrap(finuchet_lib::tracing::create_middleware())
            .configure(finuchet_lib::app_config_func(state.clone()))
    });
    server = match config.ssl {
        None => {
            warn!("Using http");
            server.bind("0.0.0.0:8000")?
        }
        Some(ssl_config) => {
            info!("Using https");

            let config = ServerConfig::builder()
                .with_safe_defaults()
                .with_no_client_auth();

            let mut cert_file = BufReader::new(
                File::open(ssl_config.certificate_chain_file)
                    .context("Error opening certificate chain file")?,
            );
            let mut key_file = BufReader::new(
                File::open(ssl_config.private_key_file)
                    .context("Error opening private key file")?,
            );

            let cert_chain = certs(&mut cert_file)
                .context("Unable to read certificate chain file")?
                .into_iter()
                .map(Certificate)
                .collect();
            let mut keys: Vec<PrivateKey> = pkcs8_private_keys(&mut key_file)
                .context("Unable to read private key file")?
                .into_iter()
                .map(PrivateKey)
                .collect();

            if keys.is_empty() {
                error!("No private key found in file");
                std::process::exit(1);
            }

            let config = config.with_single_cert(cert_chain, keys.remove(0))?;

            server.bind_rustls("0.0.0.0:8000", config)?
        }
    };
    server.run().await?;

    Ok(())
}

fn get_config_file() -> Result<PathBuf, &'static str> {
    let config_current_dir = PathBuf::from("config.toml");
    if config_current_dir.exists() {
        return Ok(config_current_dir);
    }
    if let Ok(config_env) = std::env::var("CONFIGURATION_DIRECTORY") {
        let config_path = PathBuf::from(config_env).join("config.toml");
        if config_path.exists() {
            return Ok(config_path);
        }
    }

    Err("Config file not found")
}

fn get_state_dir() -> PathBuf {
    if let Ok(state_env) = std::env::var("STATE_DIRECTORY") {
        return PathBuf::from(state_env);
    }

    PathBuf::from("data")
}

/// Gets the API key encryption key from file. If the file does not exist it will generate a new
/// key and save it to the file
fn get_encryption_key() -> Result<Vec<u8>, Box<dyn Error>> {
    let state_dir = get_state_dir();
    let key_file = state_dir.join("encryption_key");
    if key_file.exists() {
        let key = fs::read_to_string(key_file)?;
        Ok(STANDARD.decode(key.trim())?)
    } else {
        let key = KeyCipher::generate_key();

        fs::create_dir_all(state_dir)?;
        fs::write(key_file, STANDARD.encode(key))?;

        Ok(key.to_vec())
    }
}
