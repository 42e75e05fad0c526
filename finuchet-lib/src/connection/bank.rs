//! Fetching statements from bank APIs

use anyhow::Context;
use chrono::{DateTime, NaiveDate};
use finuchet_repo::connection_repo::Provider;
use finuchet_repo::transaction_repo::TransactionKind;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// A transaction as reported by the bank. Positive amounts are income, negative ones expenses.
#[derive(Clone, PartialEq, Debug)]
pub struct ExternalTransaction {
    pub external_id: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub category: Option<String>,
}

impl ExternalTransaction {
    pub fn kind(&self) -> TransactionKind {
        if self.amount.is_sign_negative() {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        }
    }
}

/// Decrypted credentials of a connection
pub struct Credentials<'a> {
    pub provider: Provider,
    pub api_key: &'a str,
    pub base_url: Option<&'a str>,
}

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Custom provider has no base URL")]
    MissingBaseUrl,
    #[error("Bank API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Deserialize)]
struct CustomResponse {
    transactions: Vec<CustomTransaction>,
}

#[derive(Deserialize)]
struct CustomTransaction {
    id: Value,
    amount: Decimal,
    description: Option<String>,
    date: String,
    category: Option<String>,
}

impl TryFrom<CustomTransaction> for ExternalTransaction {
    type Error = anyhow::Error;

    fn try_from(t: CustomTransaction) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&t.date, "%Y-%m-%d")
            .or_else(|_| DateTime::parse_from_rfc3339(&t.date).map(|d| d.date_naive()))
            .with_context(|| format!("Transaction {} has an invalid date {}", t.id, t.date))?;
        let external_id = match t.id {
            Value::String(id) => id,
            id => id.to_string(),
        };
        Ok(ExternalTransaction {
            external_id,
            amount: t.amount,
            description: t.description,
            date,
            category: t.category,
        })
    }
}

#[derive(Clone)]
pub struct BankClient {
    client: Client,
}

impl BankClient {
    pub fn new(timeout: Duration) -> Result<BankClient, anyhow::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to create HTTP client")?;
        Ok(BankClient { client })
    }

    /// Transactions between `from` and `to`. The built-in banks answer with a fixed statement
    /// dated `to`; only custom providers are called over HTTP.
    #[instrument(skip(self, credentials), fields(provider = %credentials.provider))]
    pub async fn fetch_transactions(
        &self,
        credentials: &Credentials<'_>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExternalTransaction>, BankError> {
        match credentials.provider {
            Provider::Custom => {
                let base_url = credentials.base_url.ok_or(BankError::MissingBaseUrl)?;
                self.fetch_custom(base_url, credentials.api_key, from, to)
                    .await
            }
            provider => Ok(sample_statement(provider, to)),
        }
    }

    async fn fetch_custom(
        &self,
        base_url: &str,
        api_key: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExternalTransaction>, BankError> {
        let url = format!("{}/api/transactions", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("from", from.to_string()), ("to", to.to_string())])
            .bearer_auth(api_key)
            .send()
            .await
            .context("Bank API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BankError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: CustomResponse = response
            .json()
            .await
            .context("Unable to parse bank API response")?;
        debug!(count = response.transactions.len(), "Fetched transactions");
        response
            .transactions
            .into_iter()
            .map(|t| ExternalTransaction::try_from(t).map_err(BankError::from))
            .collect()
    }
}

fn sample(
    id: &str,
    amount: i64,
    description: &str,
    category: Option<&str>,
    date: NaiveDate,
) -> ExternalTransaction {
    ExternalTransaction {
        external_id: id.to_owned(),
        amount: Decimal::new(amount, 0),
        description: Some(description.to_owned()),
        date,
        category: category.map(str::to_owned),
    }
}

fn sample_statement(provider: Provider, date: NaiveDate) -> Vec<ExternalTransaction> {
    match provider {
        Provider::Sberbank => vec![
            sample("sb1", 5000, "Salary transfer", Some("Salary"), date),
            sample("sb2", -1500, "Supermarket", Some("Groceries"), date),
        ],
        Provider::Tinkoff => vec![
            sample("tk1", 3000, "Incoming transfer", None, date),
            sample("tk2", -2500, "Restaurant", Some("Restaurants"), date),
        ],
        Provider::Alfabank => vec![
            sample("ab1", 10000, "Quarterly bonus", Some("Bonuses"), date),
            sample("ab2", -3500, "Rent", Some("Housing"), date),
        ],
        Provider::Vtb => vec![
            sample("vtb1", 7000, "Tax refund", Some("Taxes"), date),
            sample("vtb2", -1200, "Metro card", Some("Transport"), date),
        ],
        Provider::Custom => Vec::new(),
    }
}
