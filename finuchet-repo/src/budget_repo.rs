use crate::user_repo::UserId;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Week,
    Month,
    Quarter,
    Year,
}

impl Display for BudgetPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetPeriod::Week => f.write_str("week"),
            BudgetPeriod::Month => f.write_str("month"),
            BudgetPeriod::Quarter => f.write_str("quarter"),
            BudgetPeriod::Year => f.write_str("year"),
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(BudgetPeriod::Week),
            "month" => Ok(BudgetPeriod::Month),
            "quarter" => Ok(BudgetPeriod::Quarter),
            "year" => Ok(BudgetPeriod::Year),
            _ => Err(anyhow::anyhow!("Unknown budget period {}", s)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub amount: Decimal,
    pub spent: Decimal,
    pub category_id: Option<String>,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewBudget {
    pub name: String,
    pub amount: Decimal,
    pub category_id: Option<String>,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewBudget {
    pub fn into_budget(self, id: String, user_id: UserId, now: DateTime<Utc>) -> Budget {
        Budget {
            id,
            user_id,
            name: self.name,
            amount: self.amount,
            spent: Decimal::ZERO,
            category_id: self.category_id,
            period: self.period,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `None` leaves a field as is; for `category_id`, `Some(None)` clears it.
#[derive(Clone, Debug, Default)]
pub struct BudgetUpdate {
    pub name: String,
    pub amount: Decimal,
    pub category_id: Option<Option<String>>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub spent: Option<Decimal>,
}

impl BudgetUpdate {
    pub fn apply(self, budget: &mut Budget, now: DateTime<Utc>) {
        budget.name = self.name;
        budget.amount = self.amount;
        if let Some(category_id) = self.category_id {
            budget.category_id = category_id;
        }
        if let Some(period) = self.period {
            budget.period = period;
        }
        if let Some(start_date) = self.start_date {
            budget.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            budget.end_date = end_date;
        }
        if let Some(spent) = self.spent {
            budget.spent = spent;
        }
        budget.updated_at = now;
    }
}

#[derive(Default)]
pub struct BudgetFilter {
    pub period: Option<BudgetPeriod>,
    pub category_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum BudgetRepoError {
    #[error("Budget with id {0} not found")]
    BudgetNotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait BudgetRepo: Sync + Send {
    async fn get_budget(&self, budget_id: &str) -> Result<Budget, BudgetRepoError>;

    /// Budgets of the user, newest first
    async fn get_budgets(
        &self,
        user_id: &str,
        filter: BudgetFilter,
    ) -> Result<Vec<Budget>, BudgetRepoError>;

    async fn create_budget(
        &self,
        user_id: &str,
        new_budget: NewBudget,
    ) -> Result<Budget, BudgetRepoError>;

    async fn update_budget(
        &self,
        budget_id: &str,
        update: BudgetUpdate,
    ) -> Result<Budget, BudgetRepoError>;

    async fn delete_budget(&self, budget_id: &str) -> Result<(), BudgetRepoError>;

    async fn delete_user_budgets(&self, user_id: &str) -> Result<(), BudgetRepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn budget() -> Budget {
        let now = Utc::now();
        NewBudget {
            name: "Food".to_owned(),
            amount: Decimal::new(500, 0),
            category_id: Some("c1".to_owned()),
            period: BudgetPeriod::Month,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        }
        .into_budget("b1".to_owned(), "u1".to_owned(), now)
    }

    #[test]
    fn update_keeps_absent_fields() {
        let mut budget = budget();
        let update = BudgetUpdate {
            name: "Groceries".to_owned(),
            amount: Decimal::new(600, 0),
            ..Default::default()
        };
        update.apply(&mut budget, Utc::now());

        assert_eq!(budget.name, "Groceries");
        assert_eq!(budget.amount, Decimal::new(600, 0));
        assert_eq!(budget.category_id.as_deref(), Some("c1"));
        assert_eq!(budget.period, BudgetPeriod::Month);
        assert_eq!(budget.spent, Decimal::ZERO);
    }

    #[test]
    fn update_can_clear_category() {
        let mut budget = budget();
        let update = BudgetUpdate {
            name: "Food".to_owned(),
            amount: Decimal::new(500, 0),
            category_id: Some(None),
            spent: Some(Decimal::new(120, 0)),
            ..Default::default()
        };
        update.apply(&mut budget, Utc::now());

        assert_eq!(budget.category_id, None);
        assert_eq!(budget.spent, Decimal::new(120, 0));
    }

    #[test]
    fn period_parse() {
        assert_eq!("quarter".parse::<BudgetPeriod>().unwrap(), BudgetPeriod::Quarter);
        assert!("daily".parse::<BudgetPeriod>().is_err());
    }
}
