use anyhow::{ensure, Context};
use finuchet_repo::kv::WriteMode;
use serde::Deserialize;
use std::path::PathBuf;
use std::{env, fs};

#[derive(Deserialize)]
pub struct SSLConfig {
    pub private_key_file: PathBuf,
    pub certificate_chain_file: PathBuf,
}

/// Remote configuration tier. `connection_string` is the read URL including its token, writes go
/// through the management API with `api_token`.
#[derive(Deserialize, Clone, Debug)]
pub struct RemoteStorageConfig {
    pub connection_string: String,
    pub api_token: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StorageConfig {
    pub remote: Option<RemoteStorageConfig>,
    pub local_file: Option<PathBuf>,
    pub write_mode: WriteMode,
    pub backfill: bool,
    pub retry_after_secs: u64,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            remote: None,
            local_file: None,
            write_mode: WriteMode::AllAvailable,
            backfill: true,
            retry_after_secs: 60,
            timeout_secs: 5,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_days: i64,
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ttl_days: 365,
            secure_cookie: false,
        }
    }
}

/// Longest session lifetime accepted from configuration
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

impl SessionConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        ensure!(
            (1..=MAX_SESSION_TTL_DAYS).contains(&self.ttl_days),
            "Session ttl_days must be between 1 and {}, got {}",
            MAX_SESSION_TTL_DAYS,
            self.ttl_days
        );
        Ok(())
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.ttl_days)
    }
}

/// Accounts created by `POST /api/seed`. Seeding is refused when this is absent.
#[derive(Deserialize, Clone, Debug)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub demo_email: String,
    pub demo_password: String,
}

#[derive(Deserialize)]
pub struct Config {
    /// In-memory repositories are used when unset
    pub database_url: Option<String>,
    #[serde(default = "default_signups_enabled")]
    pub signups_enabled: bool,
    pub honeycomb_api_key: Option<String>,
    pub ssl: Option<SSLConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Base64 encoded 32 byte key for API credentials
    pub encryption_key: Option<String>,
    pub seed: Option<SeedConfig>,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_signups_enabled() -> bool {
    true
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Config, anyhow::Error> {
        let config = fs::read_to_string(path).context("Unable to read config file")?;
        Config::from_toml(&config)
    }

    pub fn from_toml(config: &str) -> Result<Config, anyhow::Error> {
        let config: Config = toml::from_str(config).with_context(|| "Unable to parse config")?;
        config.session.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Config, anyhow::Error> {
        let signups_enabled = match optional_env("SIGNUPS_ENABLED") {
            Some(value) => value
                .parse()
                .context("Unable to parse SIGNUPS_ENABLED value")?,
            None => default_signups_enabled(),
        };

        let mut session = SessionConfig {
            secure_cookie: true,
            ..SessionConfig::default()
        };
        if let Some(ttl_days) = optional_env("SESSION_TTL_DAYS") {
            session.ttl_days = ttl_days
                .parse()
                .context("Unable to parse SESSION_TTL_DAYS value")?;
        }
        session.validate()?;

        let storage = StorageConfig {
            remote: optional_env("EDGE_CONFIG").map(|connection_string| RemoteStorageConfig {
                connection_string,
                api_token: optional_env("EDGE_CONFIG_API_TOKEN"),
                api_base: None,
            }),
            local_file: optional_env("LOCAL_STORE_FILE").map(PathBuf::from),
            ..StorageConfig::default()
        };

        let seed = match (
            optional_env("SEED_ADMIN_EMAIL"),
            optional_env("SEED_ADMIN_PASSWORD"),
            optional_env("SEED_DEMO_EMAIL"),
            optional_env("SEED_DEMO_PASSWORD"),
        ) {
            (Some(admin_email), Some(admin_password), Some(demo_email), Some(demo_password)) => {
                Some(SeedConfig {
                    admin_email,
                    admin_password,
                    demo_email,
                    demo_password,
                })
            }
            _ => None,
        };

        let allowed_origins = optional_env("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_owned())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Config {
            database_url: optional_env("DATABASE_URL"),
            signups_enabled,
            honeycomb_api_key: optional_env("HONEYCOMB_API_KEY"),
            ssl: None,
            storage,
            session,
            encryption_key: optional_env("ENCRYPTION_KEY"),
            seed,
            allowed_origins,
        };
        Ok(config)
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}
