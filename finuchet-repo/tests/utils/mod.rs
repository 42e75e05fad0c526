pub mod generator;
pub mod test_user;

use finuchet_repo::Repos;
use serde::Deserialize;
use std::fs;
use tracing::info;

#[derive(Deserialize)]
struct TestConfig {
    database_url: String,
}

#[derive(Debug)]
pub enum RepoType {
    SQLx,
    Mem,
}

/// Postgres repos need `config_test.toml` with a `database_url`; without it the SQLx cases are
/// skipped and `None` is returned.
pub async fn build_repos(repo_type: RepoType) -> Option<Repos> {
    match repo_type {
        RepoType::SQLx => {
            let Ok(config) = fs::read_to_string("config_test.toml") else {
                info!("config_test.toml not found, skipping SQLx repo");
                return None;
            };
            let config: TestConfig = toml::from_str(config.as_str()).unwrap();
            Some(
                finuchet_repo::sqlx_repo::create_repos(&config.database_url, 1)
                    .await
                    .unwrap(),
            )
        }
        RepoType::Mem => Some(finuchet_repo::mem_repo::create_repos()),
    }
}
