use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use finuchet_repo::budget_repo::BudgetRepoError;
use finuchet_repo::category_repo::CategoryRepoError;
use finuchet_repo::connection_repo::ConnectionRepoError;
use finuchet_repo::csv_repo::CsvRepoError;
use finuchet_repo::goal_repo::GoalRepoError;
use finuchet_repo::kv::StoreError;
use finuchet_repo::session_repo::SessionRepoError;
use finuchet_repo::transaction_repo::TransactionRepoError;
use finuchet_repo::user_repo::UserRepoError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// A CSV row that could not be read
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct RowError {
    pub line: u64,
    pub message: String,
}

/// Every handler error ends up as `{"error": "..."}` with the matching status code
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    BadRequest(String),
    #[error("CSV contains invalid rows")]
    InvalidRows(Vec<RowError>),
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Access denied")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Upstream { message: String, details: String },
    #[error("Storage is unavailable")]
    StorageUnavailable(#[source] StoreError),
    #[error("Internal server error")]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn bad_request(message: impl Into<String>) -> HandlerError {
        HandlerError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> HandlerError {
        HandlerError::NotFound(message.into())
    }
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) | HandlerError::InvalidRows(_) => StatusCode::BAD_REQUEST,
            HandlerError::Unauthorized | HandlerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            HandlerError::Forbidden => StatusCode::FORBIDDEN,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            HandlerError::Conflict(_) => StatusCode::CONFLICT,
            HandlerError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            HandlerError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HandlerError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        let body = match self {
            HandlerError::InvalidRows(rows) => json!({ "error": self.to_string(), "rows": rows }),
            HandlerError::Upstream { message, details } => {
                warn!(%message, %details, "Upstream request failed");
                json!({ "error": message, "details": details })
            }
            HandlerError::StorageUnavailable(e) => {
                error!(error = %e, "Storage failed");
                json!({ "error": self.to_string(), "details": e.to_string() })
            }
            HandlerError::Other(e) => {
                error!(error = ?e, "Request failed");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// 403 unless `owner_id` is the requesting user
pub fn ensure_owner(owner_id: &str, user_id: &str) -> Result<(), HandlerError> {
    if owner_id == user_id {
        Ok(())
    } else {
        Err(HandlerError::Forbidden)
    }
}

impl From<StoreError> for HandlerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(_)
            | StoreError::NoTierAccepted(_)
            | StoreError::AllTiersFailed(_) => HandlerError::StorageUnavailable(e),
            StoreError::Other(e) => HandlerError::Other(e),
            e => HandlerError::Other(e.into()),
        }
    }
}

impl From<UserRepoError> for HandlerError {
    fn from(e: UserRepoError) -> Self {
        match e {
            UserRepoError::UserNotFound(_) => HandlerError::not_found("User not found"),
            UserRepoError::UserAlreadyExists(_) => {
                HandlerError::Conflict("User with this email already exists".to_owned())
            }
            UserRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<SessionRepoError> for HandlerError {
    fn from(e: SessionRepoError) -> Self {
        match e {
            SessionRepoError::SessionNotFound | SessionRepoError::SessionExpired => {
                HandlerError::Unauthorized
            }
            SessionRepoError::Store(e) => e.into(),
            SessionRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<CategoryRepoError> for HandlerError {
    fn from(e: CategoryRepoError) -> Self {
        match e {
            CategoryRepoError::CategoryNotFound(_) => HandlerError::not_found("Category not found"),
            CategoryRepoError::CategoryAlreadyExists(name) => {
                HandlerError::Conflict(format!("Category {} already exists", name))
            }
            CategoryRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<BudgetRepoError> for HandlerError {
    fn from(e: BudgetRepoError) -> Self {
        match e {
            BudgetRepoError::BudgetNotFound(_) => HandlerError::not_found("Budget not found"),
            BudgetRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<GoalRepoError> for HandlerError {
    fn from(e: GoalRepoError) -> Self {
        match e {
            GoalRepoError::GoalNotFound(_) => HandlerError::not_found("Goal not found"),
            GoalRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<ConnectionRepoError> for HandlerError {
    fn from(e: ConnectionRepoError) -> Self {
        match e {
            ConnectionRepoError::ConnectionNotFound(_) => {
                HandlerError::not_found("API connection not found")
            }
            ConnectionRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<TransactionRepoError> for HandlerError {
    fn from(e: TransactionRepoError) -> Self {
        match e {
            TransactionRepoError::TransactionNotFound(_) => {
                HandlerError::not_found("Transaction not found")
            }
            TransactionRepoError::Other(e) => HandlerError::Other(e),
        }
    }
}

impl From<CsvRepoError> for HandlerError {
    fn from(e: CsvRepoError) -> Self {
        match e {
            CsvRepoError::Store(e) => e.into(),
        }
    }
}

impl From<argon2::Error> for HandlerError {
    fn from(e: argon2::Error) -> Self {
        HandlerError::Other(anyhow::Error::new(e).context("Password hashing failed"))
    }
}
