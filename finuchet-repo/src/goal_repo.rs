use crate::user_repo::UserId;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FinancialGoal {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: NaiveDate,
    pub description: Option<String>,
}

impl NewGoal {
    pub fn into_goal(self, id: String, user_id: UserId, now: DateTime<Utc>) -> FinancialGoal {
        FinancialGoal {
            id,
            user_id,
            name: self.name,
            target_amount: self.target_amount,
            current_amount: self.current_amount,
            deadline: self.deadline,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `description: Some(None)` clears the description
#[derive(Clone, Debug, Default)]
pub struct GoalUpdate {
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
    pub description: Option<Option<String>>,
}

impl GoalUpdate {
    pub fn apply(self, goal: &mut FinancialGoal, now: DateTime<Utc>) {
        goal.name = self.name;
        goal.target_amount = self.target_amount;
        if let Some(current_amount) = self.current_amount {
            goal.current_amount = current_amount;
        }
        if let Some(deadline) = self.deadline {
            goal.deadline = deadline;
        }
        if let Some(description) = self.description {
            goal.description = description;
        }
        goal.updated_at = now;
    }
}

#[derive(Error, Debug)]
pub enum GoalRepoError {
    #[error("Goal with id {0} not found")]
    GoalNotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait GoalRepo: Sync + Send {
    async fn get_goal(&self, goal_id: &str) -> Result<FinancialGoal, GoalRepoError>;
    async fn get_goals(&self, user_id: &str) -> Result<Vec<FinancialGoal>, GoalRepoError>;
    async fn create_goal(
        &self,
        user_id: &str,
        new_goal: NewGoal,
    ) -> Result<FinancialGoal, GoalRepoError>;
    async fn update_goal(
        &self,
        goal_id: &str,
        update: GoalUpdate,
    ) -> Result<FinancialGoal, GoalRepoError>;
    async fn delete_goal(&self, goal_id: &str) -> Result<(), GoalRepoError>;

    async fn delete_user_goals(&self, user_id: &str) -> Result<(), GoalRepoError>;
}
