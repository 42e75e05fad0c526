use crate::category::owned_category;
use crate::error::HandlerError;
use crate::params::KindQuery;
use crate::user::UserId;
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::category_repo::{CategoryRepo, NewCategory};
use std::sync::Arc;

#[get("")]
pub async fn get_categories(
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    query: web::Query<KindQuery>,
) -> Result<impl Responder, HandlerError> {
    let kind = query.into_inner().kind()?;
    let categories = category_repo
        .get_categories(&user_id.into_inner(), kind)
        .await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[post("")]
pub async fn create_category(
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    new_category: web::Json<NewCategory>,
) -> Result<impl Responder, HandlerError> {
    let mut new_category = new_category.into_inner();
    new_category.name = new_category.name.trim().to_owned();
    if new_category.name.is_empty() {
        return Err(HandlerError::bad_request("Name is required"));
    }

    let category = category_repo
        .create_category(&user_id.into_inner(), new_category)
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

#[delete("/{category_id}")]
pub async fn delete_category(
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    category_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let category = owned_category(&category_repo, &category_id, &user_id).await?;
    let category = category_repo.delete_category(&category.id).await?;
    Ok(HttpResponse::Ok().json(category))
}
