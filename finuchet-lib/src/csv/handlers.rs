use crate::csv::{demo_records, parser, summarize};
use crate::error::HandlerError;
use crate::user::UserId;
use actix_web::web::Bytes;
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::csv_repo::CsvRepo;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[post("")]
pub async fn upload_csv(
    csv_repo: web::Data<Arc<dyn CsvRepo>>,
    user_id: web::ReqData<UserId>,
    body: Bytes,
) -> Result<impl Responder, HandlerError> {
    let records = parser::parse_statement(&body)?;
    let user_id = user_id.into_inner();
    csv_repo.store_records(&user_id, &records).await?;
    info!(%user_id, rows = records.len(), "Stored CSV statement");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "rows": records.len(),
    })))
}

#[get("")]
pub async fn get_csv(
    csv_repo: web::Data<Arc<dyn CsvRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let records = csv_repo
        .get_records(&user_id.into_inner())
        .await?
        .ok_or_else(|| HandlerError::not_found("No CSV data uploaded"))?;
    Ok(HttpResponse::Ok().json(records))
}

#[delete("")]
pub async fn delete_csv(
    csv_repo: web::Data<Arc<dyn CsvRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    csv_repo.delete_records(&user_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/summary")]
pub async fn csv_summary(
    csv_repo: web::Data<Arc<dyn CsvRepo>>,
    user_id: web::ReqData<UserId>,
) -> Result<impl Responder, HandlerError> {
    let records = csv_repo
        .get_records(&user_id.into_inner())
        .await?
        .filter(|records| !records.is_empty())
        .ok_or_else(|| HandlerError::not_found("No data to analyse"))?;
    Ok(HttpResponse::Ok().json(summarize(&records)))
}

#[get("/summary")]
pub async fn demo_summary() -> Result<impl Responder, HandlerError> {
    Ok(HttpResponse::Ok().json(summarize(&demo_records()?)))
}
