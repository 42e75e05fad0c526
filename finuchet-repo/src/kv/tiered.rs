use crate::kv::{KeyValueStore, StoreError, TierKind};
use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Write every usable tier
    AllAvailable,
    /// Stop at the first tier that accepts the write
    FirstAvailable,
}

#[derive(Clone, Debug)]
pub struct TierPolicy {
    pub write_mode: WriteMode,
    /// Copy a value found in a later tier into the earlier tiers that missed it
    pub backfill: bool,
    /// How long a failed tier is skipped before it is tried again
    pub retry_after: Duration,
}

impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy {
            write_mode: WriteMode::AllAvailable,
            backfill: true,
            retry_after: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TierStatus {
    pub kind: TierKind,
    pub available: bool,
    pub last_error: Option<String>,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub kind: TierKind,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Clone, PartialEq, Debug, Default)]
pub struct WriteReport {
    pub written: Vec<TierKind>,
    pub failed: Vec<TierKind>,
}

struct TierState {
    available: bool,
    last_error: Option<String>,
    failed_at: Option<Instant>,
    /// Keys deleted while this tier was skipped or failing. A copy it still holds is stale.
    pending_deletes: HashSet<String>,
}

struct Tier {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<TierState>,
}

impl Tier {
    fn read_lock(&self) -> Result<RwLockReadGuard<TierState>, anyhow::Error> {
        self.state
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<TierState>, anyhow::Error> {
        self.state
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn usable(&self, retry_after: Duration) -> Result<bool, anyhow::Error> {
        let state = self.read_lock()?;
        Ok(state.available
            || state
                .failed_at
                .map_or(true, |failed_at| failed_at.elapsed() >= retry_after))
    }

    fn mark_ok(&self) -> Result<(), anyhow::Error> {
        let mut state = self.write_lock()?;
        if !state.available {
            info!(tier = %self.store.kind(), "Storage tier available again");
        }
        state.available = true;
        state.failed_at = None;
        Ok(())
    }

    fn mark_failed(&self, error: &StoreError) -> Result<(), anyhow::Error> {
        warn!(tier = %self.store.kind(), %error, "Storage tier failed");
        let mut state = self.write_lock()?;
        state.available = false;
        state.last_error = Some(error.to_string());
        state.failed_at = Some(Instant::now());
        Ok(())
    }

    fn is_pending_delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        Ok(self.read_lock()?.pending_deletes.contains(key))
    }

    fn add_pending_delete(&self, key: &str) -> Result<(), anyhow::Error> {
        self.write_lock()?.pending_deletes.insert(key.to_owned());
        Ok(())
    }

    fn clear_pending_delete(&self, key: &str) -> Result<(), anyhow::Error> {
        self.write_lock()?.pending_deletes.remove(key);
        Ok(())
    }

    /// Removes a stale copy left behind by an earlier delete
    async fn retry_delete(&self, key: &str) -> Result<(), anyhow::Error> {
        match self.store.delete(key).await {
            Ok(()) => {
                self.mark_ok()?;
                self.clear_pending_delete(key)
            }
            Err(e) => self.mark_failed(&e),
        }
    }
}

/// Ordered list of storage tiers behind one key-value interface.
///
/// Reads return the first hit walking the tiers in order. A tier that errors is marked
/// unavailable and skipped until `retry_after` has passed; any later success marks it available
/// again.
pub struct TieredStore {
    tiers: Vec<Tier>,
    policy: TierPolicy,
}

impl TieredStore {
    pub fn new(stores: Vec<Arc<dyn KeyValueStore>>, policy: TierPolicy) -> TieredStore {
        let tiers = stores
            .into_iter()
            .map(|store| Tier {
                store,
                state: RwLock::new(TierState {
                    available: true,
                    last_error: None,
                    failed_at: None,
                    pending_deletes: HashSet::new(),
                }),
            })
            .collect();
        TieredStore { tiers, policy }
    }

    /// A single in-memory tier, for tests and database-less runs
    pub fn in_memory() -> TieredStore {
        TieredStore::new(
            vec![Arc::new(crate::kv::MemStore::new()) as Arc<dyn KeyValueStore>],
            TierPolicy::default(),
        )
    }

    fn usable_tiers(&self) -> Result<Vec<&Tier>, StoreError> {
        let mut tiers = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            if tier.usable(self.policy.retry_after)? {
                tiers.push(tier);
            }
        }
        Ok(tiers)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut missed: Vec<&Tier> = Vec::new();
        let mut answered = false;

        for tier in self.usable_tiers()? {
            if tier.is_pending_delete(key)? {
                tier.retry_delete(key).await?;
                answered = true;
                continue;
            }
            match tier.store.get(key).await {
                Ok(Some(value)) => {
                    tier.mark_ok()?;
                    if self.policy.backfill {
                        for earlier in missed {
                            if let Err(e) = earlier.store.set(key, value.clone()).await {
                                earlier.mark_failed(&e)?;
                            }
                        }
                    }
                    return Ok(Some(value));
                }
                Ok(None) => {
                    tier.mark_ok()?;
                    answered = true;
                    missed.push(tier);
                }
                Err(e) => tier.mark_failed(&e)?,
            }
        }

        if answered {
            Ok(None)
        } else {
            Err(StoreError::AllTiersFailed(key.to_owned()))
        }
    }

    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: Value) -> Result<WriteReport, StoreError> {
        let mut report = WriteReport::default();

        for tier in self.usable_tiers()? {
            match tier.store.set(key, value.clone()).await {
                Ok(()) => {
                    tier.mark_ok()?;
                    tier.clear_pending_delete(key)?;
                    report.written.push(tier.store.kind());
                    if self.policy.write_mode == WriteMode::FirstAvailable {
                        break;
                    }
                }
                Err(e) => {
                    tier.mark_failed(&e)?;
                    report.failed.push(tier.store.kind());
                }
            }
        }

        if report.written.is_empty() {
            Err(StoreError::NoTierAccepted(key.to_owned()))
        } else {
            Ok(report)
        }
    }

    /// Deletes from every usable tier, regardless of the write mode. Tiers that are skipped or
    /// fail remember the key, so a stale copy is neither served nor backfilled once they recover.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut deleted = false;
        for tier in &self.tiers {
            if !tier.usable(self.policy.retry_after)? {
                tier.add_pending_delete(key)?;
                continue;
            }
            match tier.store.delete(key).await {
                Ok(()) => {
                    tier.mark_ok()?;
                    tier.clear_pending_delete(key)?;
                    deleted = true;
                }
                Err(e) => {
                    tier.mark_failed(&e)?;
                    tier.add_pending_delete(key)?;
                }
            }
        }

        if deleted {
            Ok(())
        } else {
            Err(StoreError::AllTiersFailed(key.to_owned()))
        }
    }

    pub async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = BTreeSet::new();
        let mut answered = false;
        for tier in self.usable_tiers()? {
            match tier.store.keys(prefix).await {
                Ok(tier_keys) => {
                    tier.mark_ok()?;
                    answered = true;
                    let state = tier.read_lock()?;
                    keys.extend(
                        tier_keys
                            .into_iter()
                            .filter(|key| !state.pending_deletes.contains(key)),
                    );
                }
                Err(e) => tier.mark_failed(&e)?,
            }
        }

        if answered {
            Ok(keys.into_iter().collect())
        } else {
            Err(StoreError::AllTiersFailed(prefix.to_owned()))
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Serialization {
                    key: key.to_owned(),
                    source,
                }),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<WriteReport, StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
            key: key.to_owned(),
            source,
        })?;
        self.set(key, value).await
    }

    pub fn status(&self) -> Result<Vec<TierStatus>, StoreError> {
        let mut statuses = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            let state = tier.read_lock()?;
            statuses.push(TierStatus {
                kind: tier.store.kind(),
                available: state.available,
                last_error: state.last_error.clone(),
            });
        }
        Ok(statuses)
    }

    /// The tier reads are served from right now
    pub fn current_mode(&self) -> Result<Option<TierKind>, StoreError> {
        for tier in &self.tiers {
            if tier.read_lock()?.available {
                return Ok(Some(tier.store.kind()));
            }
        }
        Ok(None)
    }

    /// Probes every tier, including ones inside their retry window
    pub async fn probe_all(&self) -> Result<Vec<ProbeResult>, StoreError> {
        let mut results = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            let kind = tier.store.kind();
            match tier.store.probe().await {
                Ok(()) => {
                    tier.mark_ok()?;
                    results.push(ProbeResult {
                        kind,
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tier.mark_failed(&e)?;
                    results.push(ProbeResult {
                        kind,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(results)
    }
}
