use crate::goal_repo::{FinancialGoal, GoalRepo, GoalRepoError, GoalUpdate, NewGoal};
use crate::sqlx_repo::SQLxRepo;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{query, query_as};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct GoalEntry {
    id: String,
    user_id: String,
    name: String,
    target_amount: Decimal,
    current_amount: Decimal,
    deadline: NaiveDate,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GoalEntry> for FinancialGoal {
    fn from(value: GoalEntry) -> Self {
        FinancialGoal {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            target_amount: value.target_amount,
            current_amount: value.current_amount,
            deadline: value.deadline,
            description: value.description,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[async_trait]
impl GoalRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_goal(&self, goal_id: &str) -> Result<FinancialGoal, GoalRepoError> {
        let entry: Option<GoalEntry> = query_as("SELECT * FROM financial_goals WHERE id = $1")
            .bind(goal_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to get goal {}", goal_id))?;
        entry
            .map(FinancialGoal::from)
            .ok_or_else(|| GoalRepoError::GoalNotFound(goal_id.to_owned()))
    }

    #[instrument(skip(self))]
    async fn get_goals(&self, user_id: &str) -> Result<Vec<FinancialGoal>, GoalRepoError> {
        let entries: Vec<GoalEntry> = query_as(
            "SELECT * FROM financial_goals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Unable to get goals for user {}", user_id))?;
        Ok(entries.into_iter().map(FinancialGoal::from).collect())
    }

    #[instrument(skip(self, new_goal))]
    async fn create_goal(
        &self,
        user_id: &str,
        new_goal: NewGoal,
    ) -> Result<FinancialGoal, GoalRepoError> {
        let goal = new_goal.into_goal(crate::new_id(), user_id.to_owned(), Utc::now());
        query(
            "INSERT INTO financial_goals(id, user_id, name, target_amount, current_amount, deadline, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&goal.id)
        .bind(&goal.user_id)
        .bind(&goal.name)
        .bind(goal.target_amount)
        .bind(goal.current_amount)
        .bind(goal.deadline)
        .bind(&goal.description)
        .bind(goal.created_at)
        .bind(goal.updated_at)
        .execute(&self.pool)
        .await
        .context("Unable to insert goal")?;
        Ok(goal)
    }

    #[instrument(skip(self, update))]
    async fn update_goal(
        &self,
        goal_id: &str,
        update: GoalUpdate,
    ) -> Result<FinancialGoal, GoalRepoError> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Unable to begin DB transaction")?;

        let entry: Option<GoalEntry> =
            query_as("SELECT * FROM financial_goals WHERE id = $1 FOR UPDATE")
                .bind(goal_id)
                .fetch_optional(&mut *transaction)
                .await
                .with_context(|| format!("Unable to get goal {}", goal_id))?;
        let mut goal: FinancialGoal = entry
            .map(FinancialGoal::from)
            .ok_or_else(|| GoalRepoError::GoalNotFound(goal_id.to_owned()))?;
        update.apply(&mut goal, Utc::now());

        query(
            "UPDATE financial_goals SET name = $1, target_amount = $2, current_amount = $3, deadline = $4, description = $5, updated_at = $6 WHERE id = $7",
        )
        .bind(&goal.name)
        .bind(goal.target_amount)
        .bind(goal.current_amount)
        .bind(goal.deadline)
        .bind(&goal.description)
        .bind(goal.updated_at)
        .bind(goal_id)
        .execute(&mut *transaction)
        .await
        .with_context(|| format!("Unable to update goal {}", goal_id))?;

        transaction
            .commit()
            .await
            .context("Unable to commit DB transaction")?;
        Ok(goal)
    }

    #[instrument(skip(self))]
    async fn delete_goal(&self, goal_id: &str) -> Result<(), GoalRepoError> {
        let result = query("DELETE FROM financial_goals WHERE id = $1")
            .bind(goal_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete goal {}", goal_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(GoalRepoError::GoalNotFound(goal_id.to_owned()))
        }
    }

    #[instrument(skip(self))]
    async fn delete_user_goals(&self, user_id: &str) -> Result<(), GoalRepoError> {
        query("DELETE FROM financial_goals WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete goals of user {}", user_id))?;
        Ok(())
    }
}
