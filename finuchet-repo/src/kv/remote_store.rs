use crate::kv::{KeyValueStore, StoreError, TierKind};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::instrument;

const DEFAULT_READ_BASE: &str = "https://edge-config.vercel.com";
const DEFAULT_API_BASE: &str = "https://api.vercel.com";

#[derive(Serialize)]
struct PatchRequest<'a> {
    items: Vec<PatchItem<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
enum PatchItem<'a> {
    Upsert { key: &'a str, value: Value },
    Delete { key: &'a str },
}

/// Remote edge configuration service. Reads use the read token of the connection string; writes
/// go through the management API and need a separate API token.
///
/// The service only accepts keys matching `[A-Za-z0-9_-]`, so every key is stored URL-safe base64
/// encoded.
pub struct RemoteConfigStore {
    client: Client,
    read_base: String,
    api_base: String,
    config_id: String,
    read_token: String,
    api_token: String,
}

impl RemoteConfigStore {
    pub fn new(
        read_base: String,
        api_base: String,
        config_id: String,
        read_token: String,
        api_token: String,
        timeout: Duration,
    ) -> Result<RemoteConfigStore, anyhow::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to create HTTP client")?;
        Ok(RemoteConfigStore {
            client,
            read_base: read_base.trim_end_matches('/').to_owned(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            config_id,
            read_token,
            api_token,
        })
    }

    /// Builds the store from a connection string of the form
    /// `https://edge-config.vercel.com/<id>?token=<read token>`
    pub fn from_connection_string(
        connection_string: &str,
        api_token: String,
        timeout: Duration,
    ) -> Result<RemoteConfigStore, anyhow::Error> {
        let (read_base, config_id, read_token) = parse_connection_string(connection_string)?;
        RemoteConfigStore::new(
            read_base,
            DEFAULT_API_BASE.to_owned(),
            config_id,
            read_token,
            api_token,
            timeout,
        )
    }

    pub fn with_api_base(mut self, api_base: &str) -> RemoteConfigStore {
        self.api_base = api_base.trim_end_matches('/').to_owned();
        self
    }

    async fn patch(&self, item: PatchItem<'_>) -> Result<(), StoreError> {
        let url = format!("{}/v1/edge-config/{}/items", self.api_base, self.config_id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_token)
            .json(&PatchRequest { items: vec![item] })
            .send()
            .await
            .context("Remote config PATCH failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Remote config PATCH returned {}: {}", status, body).into());
        }
        Ok(())
    }
}

fn parse_connection_string(connection_string: &str) -> Result<(String, String, String), anyhow::Error> {
    let url = Url::parse(connection_string).context("Invalid remote config connection string")?;
    let config_id = url
        .path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()))
        .ok_or_else(|| anyhow!("Connection string has no config id"))?
        .to_owned();
    let read_token = url
        .query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow!("Connection string has no token"))?;
    let read_base = match url.host_str() {
        Some(host) => match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        },
        None => DEFAULT_READ_BASE.to_owned(),
    };
    Ok((read_base, config_id, read_token))
}

pub(crate) fn encode_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

pub(crate) fn decode_key(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

#[async_trait]
impl KeyValueStore for RemoteConfigStore {
    fn kind(&self) -> TierKind {
        TierKind::Remote
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let url = format!(
            "{}/{}/item/{}",
            self.read_base,
            self.config_id,
            encode_key(key)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("token", &self.read_token)])
            .send()
            .await
            .context("Remote config GET failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!("Remote config GET returned {}", response.status()).into());
        }
        let value: Value = response
            .json()
            .await
            .context("Unable to parse remote config value")?;
        Ok(Some(value))
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let key = encode_key(key);
        self.patch(PatchItem::Upsert { key: &key, value }).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = encode_key(key);
        self.patch(PatchItem::Delete { key: &key }).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let url = format!("{}/{}/items", self.read_base, self.config_id);
        let response = self
            .client
            .get(&url)
            .query(&[("token", &self.read_token)])
            .send()
            .await
            .context("Remote config list failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("Remote config list returned {}", response.status()).into());
        }
        let items: Map<String, Value> = response
            .json()
            .await
            .context("Unable to parse remote config items")?;
        let mut keys: Vec<String> = items
            .keys()
            .filter_map(|k| decode_key(k))
            .filter(|k| k.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }
}
