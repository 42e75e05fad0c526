use crate::config::SeedConfig;
use crate::error::HandlerError;
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::category_repo::CategoryRepo;
use finuchet_repo::kv::TieredStore;
use finuchet_repo::user_repo::UserRepo;
use finuchet_repo::HealthCheck;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[get("")]
pub async fn storage_status(
    store: web::Data<Arc<TieredStore>>,
) -> Result<impl Responder, HandlerError> {
    Ok(HttpResponse::Ok().json(json!({
        "currentMode": store.current_mode()?,
        "tiers": store.status()?,
    })))
}

pub async fn probe_storage(
    store: web::Data<Arc<TieredStore>>,
) -> Result<impl Responder, HandlerError> {
    let results = store.probe_all().await?;
    info!(?results, "Probed storage tiers");
    Ok(HttpResponse::Ok().json(json!({
        "currentMode": store.current_mode()?,
        "results": results,
    })))
}

#[get("")]
pub async fn health(health_check: web::Data<Arc<dyn HealthCheck>>) -> impl Responder {
    if health_check.check().await {
        HttpResponse::Ok().json(json!({ "status": "ok" }))
    } else {
        HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable" }))
    }
}

#[post("")]
pub async fn seed_demo(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    seed_config: web::Data<Option<SeedConfig>>,
) -> Result<impl Responder, HandlerError> {
    let Some(seed_config) = seed_config.get_ref() else {
        return Err(HandlerError::Forbidden);
    };
    let report = crate::storage::seed::seed(&user_repo, &category_repo, seed_config).await?;
    Ok(HttpResponse::Ok().json(report))
}
