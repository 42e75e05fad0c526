use crate::auth::{password, removal_cookie};
use crate::error::HandlerError;
use crate::user::{UserId, UserView};
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::budget_repo::BudgetRepo;
use finuchet_repo::category_repo::CategoryRepo;
use finuchet_repo::connection_repo::ConnectionRepo;
use finuchet_repo::csv_repo::CsvRepo;
use finuchet_repo::goal_repo::GoalRepo;
use finuchet_repo::session_repo::SessionRepo;
use finuchet_repo::transaction_repo::TransactionRepo;
use finuchet_repo::user_repo::{Role, UserRepo};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[get("")]
pub async fn get_profile(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let user = user_repo.get_user(&user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

#[patch("")]
pub async fn update_profile(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
    update: web::Json<ProfileUpdate>,
) -> Result<impl Responder, HandlerError> {
    let name = update
        .into_inner()
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| HandlerError::bad_request("Name is required"))?;

    let user = user_repo.update_name(&user_id.into_inner(), &name).await?;
    Ok(HttpResponse::Ok().json(UserView::from(user)))
}

#[post("/password")]
pub async fn change_password(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
    change: web::Json<PasswordChange>,
) -> Result<impl Responder, HandlerError> {
    let change = change.into_inner();
    let (Some(current_password), Some(new_password)) = (
        change.current_password.filter(|p| !p.is_empty()),
        change.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(HandlerError::bad_request(
            "Current and new password are required",
        ));
    };

    let user = user_repo.get_user(&user_id.into_inner()).await?;
    let password_hash = user
        .password_hash
        .ok_or_else(|| HandlerError::not_found("No password is set for this account"))?;
    if !password::verify_password(&current_password, &password_hash)? {
        return Err(HandlerError::bad_request("Current password is incorrect"));
    }

    let new_hash = password::encode_password(&new_password)?;
    user_repo.update_password_hash(&user.id, &new_hash).await?;
    info!(user_id = %user.id, "Password changed");

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Removes the account along with everything it owns
#[delete("")]
#[allow(clippy::too_many_arguments)]
pub async fn delete_profile(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    session_repo: web::Data<Arc<dyn SessionRepo>>,
    csv_repo: web::Data<Arc<dyn CsvRepo>>,
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    budget_repo: web::Data<Arc<dyn BudgetRepo>>,
    goal_repo: web::Data<Arc<dyn GoalRepo>>,
    connection_repo: web::Data<Arc<dyn ConnectionRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let user_id = user_id.into_inner();
    // Transactions and budgets reference categories and connections
    transaction_repo.delete_user_transactions(&user_id).await?;
    budget_repo.delete_user_budgets(&user_id).await?;
    goal_repo.delete_user_goals(&user_id).await?;
    connection_repo.delete_user_connections(&user_id).await?;
    category_repo.delete_user_categories(&user_id).await?;
    user_repo.delete_user(&user_id).await?;
    csv_repo.delete_records(&user_id).await?;
    session_repo.delete_user_sessions(&user_id).await?;
    info!(%user_id, "Deleted account");

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(json!({ "success": true })))
}

#[get("")]
pub async fn list_users(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let user = user_repo.get_user(&user_id.into_inner()).await?;
    if user.role != Role::Admin {
        return Err(HandlerError::Forbidden);
    }

    let users: Vec<UserView> = user_repo
        .list_users()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}
