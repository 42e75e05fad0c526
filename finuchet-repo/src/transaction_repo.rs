use crate::user_repo::UserId;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Income => f.write_str("INCOME"),
            TransactionKind::Expense => f.write_str("EXPENSE"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = anyhow::Error;

    /// Accepts both the stored form (`INCOME`) and the CSV form (`income`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            _ => Err(anyhow::anyhow!("Unknown transaction type {}", s)),
        }
    }
}

#[derive(Default)]
pub struct Filter {
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub category_id: Option<String>,
    pub kind: Option<TransactionKind>,
}

impl Filter {
    pub const NONE: Filter = Filter {
        from: None,
        until: None,
        category_id: None,
        kind: None,
    };
}

#[async_trait]
pub trait TransactionRepo: Sync + Send {
    async fn get_transaction(&self, transaction_id: &str)
        -> Result<Transaction, TransactionRepoError>;

    /// Transactions of the user matching `filter`, newest first
    async fn get_transactions(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Result<Vec<Transaction>, TransactionRepoError>;

    async fn create_transaction(
        &self,
        user_id: &str,
        new_transaction: NewTransaction,
    ) -> Result<Transaction, TransactionRepoError>;

    async fn delete_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Transaction, TransactionRepoError>;

    async fn delete_user_transactions(&self, user_id: &str) -> Result<(), TransactionRepoError>;

    async fn external_transaction_exists(
        &self,
        api_connection_id: &str,
        external_id: &str,
    ) -> Result<bool, TransactionRepoError>;
}

#[derive(Error, Debug)]
pub enum TransactionRepoError {
    #[error("Transaction with id {0} not found")]
    TransactionNotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: UserId,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub category_id: Option<String>,
    pub external_id: Option<String>,
    pub api_connection_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.date.partial_cmp(&other.date) {
            Some(Ordering::Equal) => self.created_at.partial_cmp(&other.created_at),
            ordering => ordering,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub category_id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub api_connection_id: Option<String>,
}

impl NewTransaction {
    pub fn new(
        amount: Decimal,
        kind: TransactionKind,
        description: Option<String>,
        date: NaiveDate,
        category_id: Option<String>,
    ) -> NewTransaction {
        NewTransaction {
            amount,
            kind,
            description,
            date,
            category_id,
            external_id: None,
            api_connection_id: None,
        }
    }

    pub fn imported_from(mut self, api_connection_id: &str, external_id: String) -> NewTransaction {
        self.api_connection_id = Some(api_connection_id.to_owned());
        self.external_id = Some(external_id);
        self
    }

    pub fn into_transaction(
        self,
        id: String,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Transaction {
        Transaction {
            id,
            user_id,
            amount: self.amount,
            kind: self.kind,
            description: self.description,
            date: self.date,
            category_id: self.category_id,
            external_id: self.external_id,
            api_connection_id: self.api_connection_id,
            created_at,
        }
    }
}
