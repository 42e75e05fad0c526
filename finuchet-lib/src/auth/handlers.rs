use crate::auth::{password, removal_cookie, session_cookie, session_id};
use crate::config::SessionConfig;
use crate::error::HandlerError;
use crate::user::UserView;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use finuchet_repo::session_repo::{SessionRepo, SessionRepoError};
use finuchet_repo::user_repo::{NewUser, User, UserRepo, UserRepoError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

async fn start_session(
    session_repo: &Arc<dyn SessionRepo>,
    session_config: &SessionConfig,
    user: User,
) -> Result<HttpResponse, HandlerError> {
    let session = session_repo
        .create_session(&user.id, session_config.ttl())
        .await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session, session_config))
        .json(json!({
            "success": true,
            "user": {
                "name": user.name.unwrap_or_default(),
                "email": user.email,
            },
        })))
}

#[post("/register")]
pub async fn register(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    session_repo: web::Data<Arc<dyn SessionRepo>>,
    session_config: web::Data<SessionConfig>,
    request: web::Json<RegisterRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    let (Some(email), Some(password)) = (
        request.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(HandlerError::bad_request("Email and password are required"));
    };
    if !is_valid_email(&email) {
        return Err(HandlerError::bad_request("Email is invalid"));
    }

    match user_repo.get_user_by_email(&email).await {
        Ok(_) => {
            info!(%email, "Registration with an existing email");
            return Err(UserRepoError::UserAlreadyExists(email).into());
        }
        Err(UserRepoError::UserNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let name = request
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty());
    let password_hash = password::encode_password(&password)?;
    let user = user_repo
        .create_user(NewUser::new(email, name, Some(password_hash)))
        .await?;
    info!(user_id = %user.id, "Registered user");

    start_session(&session_repo, &session_config, user).await
}

#[post("/login")]
pub async fn login(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    session_repo: web::Data<Arc<dyn SessionRepo>>,
    session_config: web::Data<SessionConfig>,
    request: web::Json<LoginRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    let (Some(email), Some(password)) = (
        request.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(HandlerError::bad_request("Email and password are required"));
    };

    let user = match user_repo.get_user_by_email(&email).await {
        Ok(user) => user,
        Err(UserRepoError::UserNotFound(_)) => return Err(HandlerError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };
    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(HandlerError::InvalidCredentials);
    };
    if !password::verify_password(&password, password_hash)? {
        return Err(HandlerError::InvalidCredentials);
    }

    info!(user_id = %user.id, "Logged in");
    start_session(&session_repo, &session_config, user).await
}

#[post("/logout")]
pub async fn logout(
    session_repo: web::Data<Arc<dyn SessionRepo>>,
    req: HttpRequest,
) -> Result<impl Responder, HandlerError> {
    if let Some(session_id) = session_id(&req) {
        session_repo.delete_session(&session_id).await?;
    }
    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(json!({ "success": true })))
}

#[get("/session")]
pub async fn current_session(
    user_repo: web::Data<Arc<dyn UserRepo>>,
    session_repo: web::Data<Arc<dyn SessionRepo>>,
    req: HttpRequest,
) -> Result<impl Responder, HandlerError> {
    let unauthenticated = || HttpResponse::Ok().json(json!({ "authenticated": false, "user": null }));

    let Some(session_id) = session_id(&req) else {
        return Ok(unauthenticated());
    };
    let session = match session_repo.get_session(&session_id).await {
        Ok(session) => session,
        Err(SessionRepoError::SessionNotFound | SessionRepoError::SessionExpired) => {
            return Ok(unauthenticated())
        }
        Err(e) => {
            warn!(error = %e, "Unable to resolve session");
            return Err(e.into());
        }
    };
    let user = match user_repo.get_user(&session.user_id).await {
        Ok(user) => user,
        Err(UserRepoError::UserNotFound(_)) => return Ok(unauthenticated()),
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok().json(json!({
        "authenticated": true,
        "user": UserView::from(user),
    })))
}
