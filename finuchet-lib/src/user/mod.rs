mod handlers;

use actix_web::{web, Scope};
use chrono::{DateTime, Utc};
use finuchet_repo::user_repo::{Role, User};
use serde::{Deserialize, Serialize};

pub use finuchet_repo::user_repo::UserId;

pub fn profile_service() -> Scope {
    web::scope("/profile")
        .service(handlers::get_profile)
        .service(handlers::update_profile)
        .service(handlers::change_password)
        .service(handlers::delete_profile)
}

pub fn users_service() -> Scope {
    web::scope("/users").service(handlers::list_users)
}

/// Public fields of a [User]
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            image: user.image,
            created_at: user.created_at,
        }
    }
}
