#![allow(dead_code)]

use std::sync::Arc;

use actix_web::cookie::Cookie;
use chrono::Duration;
use finuchet_lib::auth::{password, SESSION_COOKIE};
use finuchet_lib::config::{Config, SeedConfig};
use finuchet_lib::connection::encryption::KeyCipher;
use finuchet_lib::AppState;
use finuchet_repo::kv::TieredStore;
use finuchet_repo::user_repo::{NewUser, Role, UserId};
use rstest::*;
use tracing::info;
use tracing::Level;
use uuid::Uuid;

/// Initializes the app from an [AppState] and returns the test service
macro_rules! build_app {
    ($state:expr) => {{
        let app = actix_web::App::new()
            .wrap(finuchet_lib::tracing::create_middleware())
            .configure(finuchet_lib::app_config_func($state.clone()));
        tracing::info!("Built app");
        actix_web::test::init_service(app).await
    }};
}

/// Sends the request and returns the status with the JSON body
macro_rules! call_json {
    (&$service:ident, $request:expr) => {{
        let response = actix_web::test::call_service(&$service, $request.to_request()).await;
        let status = response.status();
        let body: serde_json::Value = actix_web::test::read_body_json(response).await;
        (status, body)
    }};
}

pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub struct TestUser {
    pub user_id: UserId,
    pub email: String,
    pub session_id: String,
}

impl TestUser {
    pub async fn new(state: &AppState) -> TestUser {
        TestUser::with_role(state, Role::User).await
    }

    pub async fn with_role(state: &AppState, role: Role) -> TestUser {
        let email = format!("test-{}@example.com", Uuid::new_v4());
        let password_hash = password::encode_password(TEST_PASSWORD).unwrap();
        let user = state
            .repos
            .user_repo
            .create_user(
                NewUser::new(email.clone(), Some("Test User".to_owned()), Some(password_hash))
                    .with_role(role),
            )
            .await
            .unwrap();
        let session = state
            .session_repo
            .create_session(&user.id, Duration::days(1))
            .await
            .unwrap();
        info!(user_id = %user.id, "Created user");
        TestUser {
            user_id: user.id,
            email,
            session_id: session.id,
        }
    }

    pub fn cookie(&self) -> Cookie<'static> {
        Cookie::new(SESSION_COOKIE, self.session_id.clone())
    }
}

#[fixture]
#[once]
pub fn tracing_setup() -> () {
    tracing_subscriber::fmt()
        .pretty()
        .with_max_level(Level::DEBUG)
        .init();
    info!("tracing initialized");
}

pub fn test_config() -> Config {
    let mut config = Config::from_toml("").unwrap();
    config.seed = Some(SeedConfig {
        admin_email: "admin@example.com".to_owned(),
        admin_password: "admin-password".to_owned(),
        demo_email: "demo@example.com".to_owned(),
        demo_password: "demo-password".to_owned(),
    });
    config
}

pub fn state_with_config(config: &Config) -> AppState {
    AppState::new(
        finuchet_repo::mem_repo::create_repos(),
        Arc::new(TieredStore::in_memory()),
        KeyCipher::new(&KeyCipher::generate_key()).unwrap(),
        config,
    )
    .unwrap()
}

#[fixture]
pub fn state() -> AppState {
    state_with_config(&test_config())
}
