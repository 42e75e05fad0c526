use crate::budget::BudgetView;
use crate::category::owned_category;
use crate::error::{ensure_owner, HandlerError};
use crate::params::{double_option, parse_date};
use crate::user::UserId;
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::budget_repo::{
    Budget, BudgetFilter, BudgetPeriod, BudgetRepo, BudgetUpdate, NewBudget,
};
use finuchet_repo::category_repo::{Category, CategoryRepo, CategoryRepoError};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetQuery {
    pub period: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPatch {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<String>>,
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub spent: Option<Decimal>,
}

fn parse_period(period: &str) -> Result<BudgetPeriod, HandlerError> {
    period
        .parse()
        .map_err(|_| HandlerError::bad_request(format!("Unknown period {}", period)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

async fn owned_budget(
    budget_repo: &Arc<dyn BudgetRepo>,
    budget_id: &str,
    user_id: &str,
) -> Result<Budget, HandlerError> {
    let budget = budget_repo.get_budget(budget_id).await?;
    ensure_owner(&budget.user_id, user_id)?;
    Ok(budget)
}

async fn with_category(
    category_repo: &Arc<dyn CategoryRepo>,
    budget: Budget,
) -> Result<BudgetView, HandlerError> {
    let category = match &budget.category_id {
        Some(category_id) => match category_repo.get_category(category_id).await {
            Ok(category) => Some(category),
            Err(CategoryRepoError::CategoryNotFound(_)) => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };
    Ok(BudgetView { budget, category })
}

#[get("")]
pub async fn get_budgets(
    budget_repo: web::Data<Arc<dyn BudgetRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    query: web::Query<BudgetQuery>,
) -> Result<impl Responder, HandlerError> {
    let query = query.into_inner();
    let filter = BudgetFilter {
        period: non_empty(query.period)
            .map(|p| parse_period(&p))
            .transpose()?,
        category_id: non_empty(query.category_id),
    };

    let user_id = user_id.into_inner();
    let budgets = budget_repo.get_budgets(&user_id, filter).await?;
    let categories: HashMap<String, Category> = category_repo
        .get_categories(&user_id, None)
        .await?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    let budgets: Vec<BudgetView> = budgets
        .into_iter()
        .map(|budget| {
            let category = budget
                .category_id
                .as_ref()
                .and_then(|id| categories.get(id).cloned());
            BudgetView { budget, category }
        })
        .collect();
    Ok(HttpResponse::Ok().json(budgets))
}

#[post("")]
pub async fn create_budget(
    budget_repo: web::Data<Arc<dyn BudgetRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    request: web::Json<BudgetRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    let (Some(name), Some(amount), Some(period), Some(start_date), Some(end_date)) = (
        non_empty(request.name),
        request.amount,
        non_empty(request.period),
        parse_date(request.start_date.as_deref(), "startDate")?,
        parse_date(request.end_date.as_deref(), "endDate")?,
    ) else {
        return Err(HandlerError::bad_request(
            "Name, amount, period, startDate and endDate are required",
        ));
    };
    if amount <= Decimal::ZERO {
        return Err(HandlerError::bad_request("Amount must be positive"));
    }
    if start_date > end_date {
        return Err(HandlerError::bad_request("startDate must not be after endDate"));
    }
    let period = parse_period(&period)?;

    let user_id = user_id.into_inner();
    let category_id = non_empty(request.category_id);
    let category = match &category_id {
        Some(category_id) => Some(owned_category(&category_repo, category_id, &user_id).await?),
        None => None,
    };

    let budget = budget_repo
        .create_budget(
            &user_id,
            NewBudget {
                name,
                amount,
                category_id,
                period,
                start_date,
                end_date,
            },
        )
        .await?;
    info!(budget_id = %budget.id, "Created budget");
    Ok(HttpResponse::Ok().json(BudgetView { budget, category }))
}

#[get("/{budget_id}")]
pub async fn get_budget(
    budget_repo: web::Data<Arc<dyn BudgetRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    budget_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let budget = owned_budget(&budget_repo, &budget_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(with_category(&category_repo, budget).await?))
}

#[patch("/{budget_id}")]
pub async fn update_budget(
    budget_repo: web::Data<Arc<dyn BudgetRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    budget_id: web::Path<String>,
    patch: web::Json<BudgetPatch>,
) -> Result<impl Responder, HandlerError> {
    let budget = owned_budget(&budget_repo, &budget_id, &user_id).await?;

    let patch = patch.into_inner();
    let (Some(name), Some(amount)) = (non_empty(patch.name), patch.amount) else {
        return Err(HandlerError::bad_request("Name and amount are required"));
    };
    if amount <= Decimal::ZERO {
        return Err(HandlerError::bad_request("Amount must be positive"));
    }
    if patch.spent.map_or(false, |spent| spent < Decimal::ZERO) {
        return Err(HandlerError::bad_request("Spent must not be negative"));
    }

    let category_id = patch.category_id.map(non_empty);
    if let Some(Some(category_id)) = &category_id {
        owned_category(&category_repo, category_id, &user_id).await?;
    }
    let start_date = parse_date(patch.start_date.as_deref(), "startDate")?;
    let end_date = parse_date(patch.end_date.as_deref(), "endDate")?;
    if start_date.unwrap_or(budget.start_date) > end_date.unwrap_or(budget.end_date) {
        return Err(HandlerError::bad_request("startDate must not be after endDate"));
    }

    let update = BudgetUpdate {
        name,
        amount,
        category_id,
        period: non_empty(patch.period)
            .map(|p| parse_period(&p))
            .transpose()?,
        start_date,
        end_date,
        spent: patch.spent,
    };
    let budget = budget_repo.update_budget(&budget.id, update).await?;
    Ok(HttpResponse::Ok().json(with_category(&category_repo, budget).await?))
}

#[delete("/{budget_id}")]
pub async fn delete_budget(
    budget_repo: web::Data<Arc<dyn BudgetRepo>>,
    user_id: web::ReqData<UserId>,
    budget_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let budget = owned_budget(&budget_repo, &budget_id, &user_id).await?;
    budget_repo.delete_budget(&budget.id).await?;
    info!(budget_id = %budget.id, "Deleted budget");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
