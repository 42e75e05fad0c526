use crate::csv_repo::{CsvRecord, CsvRepo, CsvRepoError};
use crate::kv::TieredStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

const CSV_PREFIX: &str = "csv:";

pub struct KvCsvRepo {
    store: Arc<TieredStore>,
}

impl KvCsvRepo {
    pub fn new(store: Arc<TieredStore>) -> KvCsvRepo {
        KvCsvRepo { store }
    }
}

fn csv_key(user_id: &str) -> String {
    format!("{}{}", CSV_PREFIX, user_id)
}

#[async_trait]
impl CsvRepo for KvCsvRepo {
    #[instrument(skip(self))]
    async fn get_records(&self, user_id: &str) -> Result<Option<Vec<CsvRecord>>, CsvRepoError> {
        Ok(self.store.get_json(&csv_key(user_id)).await?)
    }

    #[instrument(skip(self, records), fields(rows = records.len()))]
    async fn store_records(&self, user_id: &str, records: &[CsvRecord]) -> Result<(), CsvRepoError> {
        let report = self.store.set_json(&csv_key(user_id), records).await?;
        debug!(written = ?report.written, failed = ?report.failed, "Stored CSV records");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_records(&self, user_id: &str) -> Result<(), CsvRepoError> {
        Ok(self.store.delete(&csv_key(user_id)).await?)
    }
}
