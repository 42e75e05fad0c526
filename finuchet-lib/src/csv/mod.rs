mod handlers;
pub mod parser;

use crate::summary::Summary;
use actix_web::{web, Scope};
use finuchet_repo::csv_repo::CsvRecord;

const DEMO_STATEMENT: &str = include_str!("demo.csv");

pub fn csv_service() -> Scope {
    web::scope("/csv")
        .service(handlers::upload_csv)
        .service(handlers::get_csv)
        .service(handlers::delete_csv)
        .service(handlers::csv_summary)
}

pub fn demo_service() -> Scope {
    web::scope("/demo").service(handlers::demo_summary)
}

pub fn summarize(records: &[CsvRecord]) -> Summary {
    let mut summary = Summary::default();
    for record in records {
        summary.add(
            record.date,
            record.kind,
            record.category.as_deref(),
            record.amount,
        );
    }
    summary
}

pub fn demo_records() -> Result<Vec<CsvRecord>, crate::error::HandlerError> {
    parser::parse_statement(DEMO_STATEMENT.as_bytes())
}
