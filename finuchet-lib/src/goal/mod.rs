mod handlers;

use actix_web::{web, Scope};

pub fn goal_service() -> Scope {
    web::scope("/goals")
        .service(handlers::get_goals)
        .service(handlers::create_goal)
        .service(handlers::get_goal)
        .service(handlers::update_goal)
        .service(handlers::delete_goal)
}
