use crate::budget_repo::{Budget, BudgetFilter, BudgetRepo, BudgetRepoError, BudgetUpdate, NewBudget};
use crate::sqlx_repo::SQLxRepo;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{query, query_as, QueryBuilder};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct BudgetEntry {
    id: String,
    user_id: String,
    name: String,
    amount: Decimal,
    spent: Decimal,
    category_id: Option<String>,
    period: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BudgetEntry> for Budget {
    type Error = anyhow::Error;

    fn try_from(value: BudgetEntry) -> Result<Self, Self::Error> {
        Ok(Budget {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            amount: value.amount,
            spent: value.spent,
            category_id: value.category_id,
            period: value.period.parse()?,
            start_date: value.start_date,
            end_date: value.end_date,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[async_trait]
impl BudgetRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_budget(&self, budget_id: &str) -> Result<Budget, BudgetRepoError> {
        let entry: Option<BudgetEntry> = query_as("SELECT * FROM budgets WHERE id = $1")
            .bind(budget_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to get budget {}", budget_id))?;
        let entry = entry.ok_or_else(|| BudgetRepoError::BudgetNotFound(budget_id.to_owned()))?;
        Ok(Budget::try_from(entry)?)
    }

    #[instrument(skip(self, filter))]
    async fn get_budgets(
        &self,
        user_id: &str,
        filter: BudgetFilter,
    ) -> Result<Vec<Budget>, BudgetRepoError> {
        let mut query_builder = QueryBuilder::new("SELECT * FROM budgets WHERE user_id = ");
        query_builder.push_bind(user_id);
        if let Some(period) = filter.period {
            query_builder
                .push(" AND period = ")
                .push_bind(period.to_string());
        }
        if let Some(category_id) = filter.category_id {
            query_builder
                .push(" AND category_id = ")
                .push_bind(category_id);
        }
        query_builder.push(" ORDER BY created_at DESC");
        let entries: Vec<BudgetEntry> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Unable to get budgets for user {}", user_id))?;
        let budgets = entries
            .into_iter()
            .map(Budget::try_from)
            .collect::<Result<Vec<Budget>, anyhow::Error>>()?;
        Ok(budgets)
    }

    #[instrument(skip(self, new_budget))]
    async fn create_budget(
        &self,
        user_id: &str,
        new_budget: NewBudget,
    ) -> Result<Budget, BudgetRepoError> {
        let budget = new_budget.into_budget(crate::new_id(), user_id.to_owned(), Utc::now());
        query(
            "INSERT INTO budgets(id, user_id, name, amount, spent, category_id, period, start_date, end_date, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&budget.id)
        .bind(&budget.user_id)
        .bind(&budget.name)
        .bind(budget.amount)
        .bind(budget.spent)
        .bind(&budget.category_id)
        .bind(budget.period.to_string())
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.created_at)
        .bind(budget.updated_at)
        .execute(&self.pool)
        .await
        .context("Unable to insert budget")?;
        Ok(budget)
    }

    #[instrument(skip(self, update))]
    async fn update_budget(
        &self,
        budget_id: &str,
        update: BudgetUpdate,
    ) -> Result<Budget, BudgetRepoError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Unable to begin DB transaction")?;

        let entry: Option<BudgetEntry> =
            query_as("SELECT * FROM budgets WHERE id = $1 FOR UPDATE")
                .bind(budget_id)
                .fetch_optional(&mut *transaction)
                .await
                .with_context(|| format!("Unable to get budget {}", budget_id))?;
        let entry = entry.ok_or_else(|| BudgetRepoError::BudgetNotFound(budget_id.to_owned()))?;
        let mut budget = Budget::try_from(entry)?;
        update.apply(&mut budget, Utc::now());

        query(
            "UPDATE budgets SET name = $1, amount = $2, spent = $3, category_id = $4, period = $5, start_date = $6, end_date = $7, updated_at = $8 WHERE id = $9",
        )
        .bind(&budget.name)
        .bind(budget.amount)
        .bind(budget.spent)
        .bind(&budget.category_id)
        .bind(budget.period.to_string())
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.updated_at)
        .bind(budget_id)
        .execute(&mut *transaction)
        .await
        .with_context(|| format!("Unable to update budget {}", budget_id))?;

        transaction
            .commit()
            .await
            .context("Unable to commit DB transaction")?;
        Ok(budget)
    }

    #[instrument(skip(self))]
    async fn delete_budget(&self, budget_id: &str) -> Result<(), BudgetRepoError> {
        let result = query("DELETE FROM budgets WHERE id = $1")
            .bind(budget_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete budget {}", budget_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(BudgetRepoError::BudgetNotFound(budget_id.to_owned()))
        }
    }

    #[instrument(skip(self))]
    async fn delete_user_budgets(&self, user_id: &str) -> Result<(), BudgetRepoError> {
        query("DELETE FROM budgets WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete budgets of user {}", user_id))?;
        Ok(())
    }
}
