use crate::config::SessionConfig;
use crate::error::HandlerError;
use crate::user::UserId;
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::{Payload, ServiceRequest};
use actix_web::http::header::Header;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest, Scope};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use anyhow::anyhow;
use finuchet_repo::session_repo::{Session, SessionRepo};
use finuchet_repo::user_repo::{UserRepo, UserRepoError};
use std::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_actix_web::RootSpan;

pub mod handlers;
pub mod password;

pub const SESSION_COOKIE: &str = "sessionId";

pub fn auth_service(signups_enabled: bool) -> Scope {
    let scope = web::scope("/auth")
        .service(handlers::login)
        .service(handlers::logout)
        .service(handlers::current_session);
    if signups_enabled {
        scope.service(handlers::register)
    } else {
        scope
    }
}

/// Session id sent by the client, taken from the `sessionId` cookie or else from an
/// `Authorization: Bearer` header
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

impl FromRequest for SessionToken {
    type Error = HandlerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            session_id(req)
                .map(SessionToken)
                .ok_or(HandlerError::Unauthorized),
        )
    }
}

pub fn session_id(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_owned());
        }
    }
    Authorization::<Bearer>::parse(req)
        .ok()
        .map(|auth| auth.into_scheme().token().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolves the session through the [SessionRepo] in the app data and checks that its user still
/// exists. If valid, injects the user id into the request and into the [RootSpan]
pub async fn session_validator(
    req: ServiceRequest,
    token: SessionToken,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let (Some(session_repo), Some(user_repo)) = (
        req.app_data::<web::Data<Arc<dyn SessionRepo>>>().cloned(),
        req.app_data::<web::Data<Arc<dyn UserRepo>>>().cloned(),
    ) else {
        let e = HandlerError::Other(anyhow!("Session or user repository not configured"));
        return Err((e.into(), req));
    };

    let session = match session_repo.get_session(&token.0).await {
        Ok(session) => session,
        Err(e) => {
            debug!(error = %e, "Session rejected");
            return Err((HandlerError::from(e).into(), req));
        }
    };
    match user_repo.get_user(&session.user_id).await {
        Ok(_) => {}
        Err(UserRepoError::UserNotFound(_)) => {
            debug!(user_id = %session.user_id, "Session belongs to a deleted user");
            if let Err(e) = session_repo.delete_session(&session.id).await {
                warn!(error = %e, "Unable to remove orphaned session");
            }
            return Err((HandlerError::Unauthorized.into(), req));
        }
        Err(e) => return Err((HandlerError::from(e).into(), req)),
    }

    if let Some(root_span) = req.extensions().get::<RootSpan>() {
        root_span.record("user_id", &session.user_id.as_str());
    }
    req.extensions_mut().insert::<UserId>(session.user_id);
    Ok(req)
}

pub fn session_cookie(session: &Session, config: &SessionConfig) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session.id.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(time::Duration::days(config.ttl_days))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}
