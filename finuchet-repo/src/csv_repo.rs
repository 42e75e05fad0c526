use crate::kv::StoreError;
use crate::transaction_repo::TransactionKind;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of an uploaded CSV statement
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct CsvRecord {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Error, Debug)]
pub enum CsvRepoError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait CsvRepo: Sync + Send {
    async fn get_records(&self, user_id: &str) -> Result<Option<Vec<CsvRecord>>, CsvRepoError>;

    /// Replaces whatever the user uploaded before
    async fn store_records(&self, user_id: &str, records: &[CsvRecord]) -> Result<(), CsvRepoError>;

    async fn delete_records(&self, user_id: &str) -> Result<(), CsvRepoError>;
}
