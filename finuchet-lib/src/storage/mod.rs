//! Operational endpoints: storage tier status, health and demo data seeding

mod handlers;
pub mod seed;

use actix_web::{web, Scope};
use actix_web_httpauth::middleware::HttpAuthentication;

pub fn storage_status_service() -> Scope {
    web::scope("/storage-status")
        .service(handlers::storage_status)
        .service(
            web::resource("/probe")
                .wrap(HttpAuthentication::with_fn(crate::auth::session_validator))
                .route(web::post().to(handlers::probe_storage)),
        )
}

pub fn health_service() -> Scope {
    web::scope("/health").service(handlers::health)
}

pub fn seed_service() -> Scope {
    web::scope("/seed").service(handlers::seed_demo)
}
