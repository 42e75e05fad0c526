use crate::budget_repo::BudgetRepoError::BudgetNotFound;
use crate::budget_repo::{Budget, BudgetFilter, BudgetRepo, BudgetRepoError, BudgetUpdate, NewBudget};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemBudgetRepo {
    budgets: RwLock<HashMap<String, Budget>>,
}

impl MemBudgetRepo {
    pub fn new() -> MemBudgetRepo {
        MemBudgetRepo {
            budgets: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, Budget>>, anyhow::Error> {
        self.budgets
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<HashMap<String, Budget>>, anyhow::Error> {
        self.budgets
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl BudgetRepo for MemBudgetRepo {
    async fn get_budget(&self, budget_id: &str) -> Result<Budget, BudgetRepoError> {
        self.read_lock()?
            .get(budget_id)
            .cloned()
            .ok_or_else(|| BudgetNotFound(budget_id.to_owned()))
    }

    async fn get_budgets(
        &self,
        user_id: &str,
        filter: BudgetFilter,
    ) -> Result<Vec<Budget>, BudgetRepoError> {
        let mut budgets: Vec<Budget> = self
            .read_lock()?
            .values()
            .filter(|b| b.user_id == user_id)
            .filter(|b| filter.period.map_or(true, |p| b.period == p))
            .filter(|b| match &filter.category_id {
                Some(category_id) => b.category_id.as_ref() == Some(category_id),
                None => true,
            })
            .cloned()
            .collect();
        budgets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(budgets)
    }

    async fn create_budget(
        &self,
        user_id: &str,
        new_budget: NewBudget,
    ) -> Result<Budget, BudgetRepoError> {
        let budget = new_budget.into_budget(crate::new_id(), user_id.to_owned(), Utc::now());
        self.write_lock()?
            .insert(budget.id.clone(), budget.clone());
        Ok(budget)
    }

    async fn update_budget(
        &self,
        budget_id: &str,
        update: BudgetUpdate,
    ) -> Result<Budget, BudgetRepoError> {
        let mut write_guard = self.write_lock()?;

        let budget = write_guard
            .get_mut(budget_id)
            .ok_or_else(|| BudgetNotFound(budget_id.to_owned()))?;
        update.apply(budget, Utc::now());
        Ok(budget.clone())
    }

    async fn delete_budget(&self, budget_id: &str) -> Result<(), BudgetRepoError> {
        self.write_lock()?
            .remove(budget_id)
            .map(|_| ())
            .ok_or_else(|| BudgetNotFound(budget_id.to_owned()))
    }

    async fn delete_user_budgets(&self, user_id: &str) -> Result<(), BudgetRepoError> {
        self.write_lock()?.retain(|_, budget| budget.user_id != user_id);
        Ok(())
    }
}
