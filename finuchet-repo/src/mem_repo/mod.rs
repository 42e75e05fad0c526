use crate::{HealthCheck, Repos};
use async_trait::async_trait;
use std::sync::Arc;

mod budget_repo;
mod category_repo;
mod connection_repo;
mod goal_repo;
mod transaction_repo;
mod user_repo;

struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn check(&self) -> bool {
        true
    }
}

pub fn create_repos() -> Repos {
    Repos {
        user_repo: Arc::new(user_repo::MemUserRepo::new()),
        category_repo: Arc::new(category_repo::MemCategoryRepo::new()),
        budget_repo: Arc::new(budget_repo::MemBudgetRepo::new()),
        goal_repo: Arc::new(goal_repo::MemGoalRepo::new()),
        connection_repo: Arc::new(connection_repo::MemConnectionRepo::new()),
        transaction_repo: Arc::new(transaction_repo::MemTransactionRepo::new()),
        health_check: Arc::new(AlwaysHealthy),
    }
}
