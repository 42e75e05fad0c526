mod handlers;

use crate::error::{ensure_owner, HandlerError};
use actix_web::{web, Scope};
use finuchet_repo::category_repo::{Category, CategoryRepo};
use std::sync::Arc;

pub fn category_service() -> Scope {
    web::scope("/categories")
        .service(handlers::get_categories)
        .service(handlers::create_category)
        .service(handlers::delete_category)
}

/// 404 for an unknown category, 403 for a category of another user
pub async fn owned_category(
    category_repo: &Arc<dyn CategoryRepo>,
    category_id: &str,
    user_id: &str,
) -> Result<Category, HandlerError> {
    let category = category_repo.get_category(category_id).await?;
    ensure_owner(&category.user_id, user_id)?;
    Ok(category)
}
