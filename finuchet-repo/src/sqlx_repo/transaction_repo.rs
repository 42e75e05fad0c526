use crate::sqlx_repo::SQLxRepo;
use crate::transaction_repo::TransactionRepoError::TransactionNotFound;
use crate::transaction_repo::{
    Filter, NewTransaction, Transaction, TransactionRepo, TransactionRepoError,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{query, query_as, query_scalar, QueryBuilder};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct TransactionEntry {
    id: String,
    user_id: String,
    amount: Decimal,
    kind: String,
    description: Option<String>,
    date: NaiveDate,
    category_id: Option<String>,
    external_id: Option<String>,
    api_connection_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionEntry> for Transaction {
    type Error = anyhow::Error;

    fn try_from(value: TransactionEntry) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: value.id,
            user_id: value.user_id,
            amount: value.amount,
            kind: value.kind.parse()?,
            description: value.description,
            date: value.date,
            category_id: value.category_id,
            external_id: value.external_id,
            api_connection_id: value.api_connection_id,
            created_at: value.created_at,
        })
    }
}

#[async_trait]
impl TransactionRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Transaction, TransactionRepoError> {
        let entry: Option<TransactionEntry> =
            query_as("SELECT * FROM transactions WHERE id = $1")
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to get transaction {}", transaction_id))?;
        let entry = entry.ok_or_else(|| TransactionNotFound(transaction_id.to_owned()))?;
        Ok(Transaction::try_from(entry)?)
    }

    #[instrument(skip(self, filter))]
    async fn get_transactions(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Result<Vec<Transaction>, TransactionRepoError> {
        let mut query_builder = QueryBuilder::new("SELECT * FROM transactions WHERE user_id = ");
        query_builder.push_bind(user_id);
        if let Some(from) = filter.from {
            query_builder.push(" AND date >= ").push_bind(from);
        }
        if let Some(until) = filter.until {
            query_builder.push(" AND date <= ").push_bind(until);
        }
        if let Some(category_id) = filter.category_id {
            query_builder
                .push(" AND category_id = ")
                .push_bind(category_id);
        }
        if let Some(kind) = filter.kind {
            query_builder.push(" AND kind = ").push_bind(kind.to_string());
        }
        query_builder.push(" ORDER BY date DESC, created_at DESC");
        let entries: Vec<TransactionEntry> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Unable to get transactions for user {}", user_id))?;
        let transactions = entries
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<Transaction>, anyhow::Error>>()?;
        Ok(transactions)
    }

    #[instrument(skip(self, new_transaction))]
    async fn create_transaction(
        &self,
        user_id: &str,
        new_transaction: NewTransaction,
    ) -> Result<Transaction, TransactionRepoError> {
        let transaction =
            new_transaction.into_transaction(crate::new_id(), user_id.to_owned(), Utc::now());
        query(
            "INSERT INTO transactions(id, user_id, amount, kind, description, date, category_id, external_id, api_connection_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&transaction.id)
        .bind(&transaction.user_id)
        .bind(transaction.amount)
        .bind(transaction.kind.to_string())
        .bind(&transaction.description)
        .bind(transaction.date)
        .bind(&transaction.category_id)
        .bind(&transaction.external_id)
        .bind(&transaction.api_connection_id)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await
        .context("Unable to insert transaction")?;
        Ok(transaction)
    }

    #[instrument(skip(self))]
    async fn delete_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Transaction, TransactionRepoError> {
        let entry: Option<TransactionEntry> =
            query_as("DELETE FROM transactions WHERE id = $1 RETURNING *")
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to delete transaction {}", transaction_id))?;
        let entry = entry.ok_or_else(|| TransactionNotFound(transaction_id.to_owned()))?;
        Ok(Transaction::try_from(entry)?)
    }

    #[instrument(skip(self))]
    async fn delete_user_transactions(&self, user_id: &str) -> Result<(), TransactionRepoError> {
        query("DELETE FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete transactions of user {}", user_id))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn external_transaction_exists(
        &self,
        api_connection_id: &str,
        external_id: &str,
    ) -> Result<bool, TransactionRepoError> {
        let exists: bool = query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE api_connection_id = $1 AND external_id = $2)",
        )
        .bind(api_connection_id)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
        .context("Unable to look up imported transaction")?;
        Ok(exists)
    }
}
