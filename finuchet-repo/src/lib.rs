use async_trait::async_trait;
use std::sync::Arc;

pub mod budget_repo;
pub mod category_repo;
pub mod connection_repo;
pub mod csv_repo;
pub mod goal_repo;
pub mod session_repo;
pub mod transaction_repo;
pub mod user_repo;

pub mod kv;

// implementation modules
pub mod kv_repo;
pub mod mem_repo;
pub mod sqlx_repo;

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> bool;
}

/// Every record repository backed by the same store. The session and CSV repositories live on the
/// tiered key-value store instead and are built separately, see [kv_repo].
#[derive(Clone)]
pub struct Repos {
    pub user_repo: Arc<dyn user_repo::UserRepo>,
    pub category_repo: Arc<dyn category_repo::CategoryRepo>,
    pub budget_repo: Arc<dyn budget_repo::BudgetRepo>,
    pub goal_repo: Arc<dyn goal_repo::GoalRepo>,
    pub connection_repo: Arc<dyn connection_repo::ConnectionRepo>,
    pub transaction_repo: Arc<dyn transaction_repo::TransactionRepo>,
    pub health_check: Arc<dyn HealthCheck>,
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
