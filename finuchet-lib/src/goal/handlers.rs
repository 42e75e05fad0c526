use crate::error::{ensure_owner, HandlerError};
use crate::params::{double_option, parse_date};
use crate::user::UserId;
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::goal_repo::{FinancialGoal, GoalRepo, GoalUpdate, NewGoal};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRequest {
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    pub deadline: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn check_amounts(target: Decimal, current: Option<Decimal>) -> Result<(), HandlerError> {
    if target <= Decimal::ZERO {
        return Err(HandlerError::bad_request("Target amount must be positive"));
    }
    if current.map_or(false, |current| current < Decimal::ZERO) {
        return Err(HandlerError::bad_request(
            "Current amount must not be negative",
        ));
    }
    Ok(())
}

async fn owned_goal(
    goal_repo: &Arc<dyn GoalRepo>,
    goal_id: &str,
    user_id: &str,
) -> Result<FinancialGoal, HandlerError> {
    let goal = goal_repo.get_goal(goal_id).await?;
    ensure_owner(&goal.user_id, user_id)?;
    Ok(goal)
}

#[get("")]
pub async fn get_goals(
    goal_repo: web::Data<Arc<dyn GoalRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let goals = goal_repo.get_goals(&user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(goals))
}

#[post("")]
pub async fn create_goal(
    goal_repo: web::Data<Arc<dyn GoalRepo>>,
    user_id: web::ReqData<UserId>,
    request: web::Json<GoalRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    let (Some(name), Some(target_amount), Some(deadline)) = (
        trimmed(request.name),
        request.target_amount,
        parse_date(request.deadline.as_deref(), "deadline")?,
    ) else {
        return Err(HandlerError::bad_request(
            "Name, targetAmount and deadline are required",
        ));
    };
    check_amounts(target_amount, request.current_amount)?;

    let goal = goal_repo
        .create_goal(
            &user_id.into_inner(),
            NewGoal {
                name,
                target_amount,
                current_amount: request.current_amount.unwrap_or(Decimal::ZERO),
                deadline,
                description: trimmed(request.description),
            },
        )
        .await?;
    info!(goal_id = %goal.id, "Created goal");
    Ok(HttpResponse::Ok().json(goal))
}

#[get("/{goal_id}")]
pub async fn get_goal(
    goal_repo: web::Data<Arc<dyn GoalRepo>>,
    user_id: web::ReqData<UserId>,
    goal_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let goal = owned_goal(&goal_repo, &goal_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(goal))
}

#[patch("/{goal_id}")]
pub async fn update_goal(
    goal_repo: web::Data<Arc<dyn GoalRepo>>,
    user_id: web::ReqData<UserId>,
    goal_id: web::Path<String>,
    patch: web::Json<GoalPatch>,
) -> Result<impl Responder, HandlerError> {
    let goal = owned_goal(&goal_repo, &goal_id, &user_id).await?;

    let patch = patch.into_inner();
    let (Some(name), Some(target_amount)) = (trimmed(patch.name), patch.target_amount) else {
        return Err(HandlerError::bad_request(
            "Name and targetAmount are required",
        ));
    };
    check_amounts(target_amount, patch.current_amount)?;

    let update = GoalUpdate {
        name,
        target_amount,
        current_amount: patch.current_amount,
        deadline: parse_date(patch.deadline.as_deref(), "deadline")?,
        // an empty description clears it like null does
        description: patch.description.map(trimmed),
    };
    let goal = goal_repo.update_goal(&goal.id, update).await?;
    Ok(HttpResponse::Ok().json(goal))
}

#[delete("/{goal_id}")]
pub async fn delete_goal(
    goal_repo: web::Data<Arc<dyn GoalRepo>>,
    user_id: web::ReqData<UserId>,
    goal_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let goal = owned_goal(&goal_repo, &goal_id, &user_id).await?;
    goal_repo.delete_goal(&goal.id).await?;
    info!(goal_id = %goal.id, "Deleted goal");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
