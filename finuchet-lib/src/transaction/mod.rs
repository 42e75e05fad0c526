mod handlers;

use actix_web::{web, Scope};

pub fn transaction_service() -> Scope {
    web::scope("/transactions")
        .service(handlers::get_transactions)
        .service(handlers::create_transaction)
        .service(handlers::get_transaction)
        .service(handlers::delete_transaction)
}

pub fn report_service() -> Scope {
    web::scope("/reports").service(handlers::summary_report)
}
