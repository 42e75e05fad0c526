//! Key-value storage tiers and the [TieredStore] that walks them in order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use thiserror::Error;

mod file_store;
mod mem_store;
mod remote_store;
mod tiered;

pub use file_store::FileStore;
pub use mem_store::MemStore;
pub use remote_store::RemoteConfigStore;
pub use tiered::{ProbeResult, TierPolicy, TierStatus, TieredStore, WriteMode, WriteReport};

pub const PROBE_KEY: &str = "__probe__";

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TierKind {
    #[serde(rename = "remote-config")]
    Remote,
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "local-file")]
    LocalFile,
}

impl Display for TierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TierKind::Remote => f.write_str("remote-config"),
            TierKind::Memory => f.write_str("memory"),
            TierKind::LocalFile => f.write_str("local-file"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} storage tier is unavailable")]
    Unavailable(TierKind),
    #[error("Unable to serialize value of {key}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Probe read back {actual}, expected {expected}")]
    ProbeMismatch { expected: String, actual: String },
    #[error("No storage tier accepted {0}")]
    NoTierAccepted(String),
    #[error("Every storage tier failed for {0}")]
    AllTiersFailed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn kind(&self) -> TierKind;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Writes [PROBE_KEY], reads it back and removes it again
    async fn probe(&self) -> Result<(), StoreError> {
        let expected = chrono::Utc::now().timestamp_millis().to_string();
        self.set(PROBE_KEY, Value::String(expected.clone())).await?;
        let actual = self.get(PROBE_KEY).await?;
        self.delete(PROBE_KEY).await?;
        match actual {
            Some(Value::String(actual)) if actual == expected => Ok(()),
            actual => Err(StoreError::ProbeMismatch {
                expected,
                actual: actual.map(|v| v.to_string()).unwrap_or_else(|| "nothing".to_owned()),
            }),
        }
    }
}
