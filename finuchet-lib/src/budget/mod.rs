mod handlers;

use actix_web::{web, Scope};
use finuchet_repo::budget_repo::Budget;
use finuchet_repo::category_repo::Category;
use serde::Serialize;

pub fn budget_service() -> Scope {
    web::scope("/budgets")
        .service(handlers::get_budgets)
        .service(handlers::create_budget)
        .service(handlers::get_budget)
        .service(handlers::update_budget)
        .service(handlers::delete_budget)
}

/// A [Budget] with its category embedded
#[derive(Serialize, Debug)]
pub struct BudgetView {
    #[serde(flatten)]
    pub budget: Budget,
    pub category: Option<Category>,
}
