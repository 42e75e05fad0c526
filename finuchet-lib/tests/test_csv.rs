use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use finuchet_lib::AppState;
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

use utils::{state, tracing_setup, TestUser};

#[macro_use]
mod utils;

const STATEMENT: &str = "date,type,category,amount,description\n\
                         2024-01-05,income,Salary,2000,January salary\n\
                         2024-01-07,expense,Groceries,\"85,40\",Market\n\
                         2024-02-02,expense,,15,\n";

fn decimal(value: &serde_json::Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[rstest]
#[actix_rt::test]
async fn upload_and_summarize(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/csv")
            .cookie(user.cookie())
            .insert_header(("Content-Type", "text/csv"))
            .set_payload(STATEMENT)
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "rows": 3 }));

    let (status, records) = call_json!(
        &service,
        TestRequest::get().uri("/api/csv").cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 3);
    assert_eq!(records[0]["type"], "INCOME");
    assert_eq!(records[2]["category"], serde_json::Value::Null);

    let (status, summary) = call_json!(
        &service,
        TestRequest::get()
            .uri("/api/csv/summary")
            .cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&summary["totalIncome"]), Decimal::new(2000, 0));
    assert_eq!(decimal(&summary["totalExpense"]), Decimal::new(10040, 2));
    assert_eq!(decimal(&summary["profit"]), Decimal::new(189960, 2));
    assert_eq!(
        decimal(&summary["categorySummary"]["Uncategorized"]["expense"]),
        Decimal::new(15, 0)
    );
    assert_eq!(
        decimal(&summary["monthlySummary"]["2024-01"]["expense"]),
        Decimal::new(8540, 2)
    );
}

#[rstest]
#[actix_rt::test]
async fn invalid_rows_are_rejected(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let statement = "date,type,category,amount,description\n\
                     2024-01-05,income,Salary,2000,\n\
                     2024-13-01,income,Salary,2000,\n\
                     2024-01-06,expense,Food,lots,\n";
    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/csv")
            .cookie(user.cookie())
            .set_payload(statement)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CSV contains invalid rows");
    assert_eq!(body["rows"][0]["line"], 3);
    assert_eq!(body["rows"][1]["line"], 4);

    let (status, body) = call_json!(
        &service,
        TestRequest::get().uri("/api/csv").cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[rstest]
#[actix_rt::test]
async fn empty_upload(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, _) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/csv")
            .cookie(user.cookie())
            .set_payload("")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_rt::test]
async fn summary_without_data(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, body) = call_json!(
        &service,
        TestRequest::get()
            .uri("/api/csv/summary")
            .cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No data to analyse");
}

#[rstest]
#[actix_rt::test]
async fn statements_are_per_user(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let other = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, _) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/csv")
            .cookie(user.cookie())
            .set_payload(STATEMENT)
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call_json!(
        &service,
        TestRequest::get().uri("/api/csv").cookie(other.cookie())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call_json!(
        &service,
        TestRequest::delete().uri("/api/csv").cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = call_json!(
        &service,
        TestRequest::get().uri("/api/csv").cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_rt::test]
async fn demo_summary_is_public(_tracing_setup: &(), state: AppState) {
    let service = build_app!(state);

    let (status, summary) = call_json!(&service, TestRequest::get().uri("/api/demo/summary"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&summary["totalIncome"]), Decimal::new(275000, 0));
    assert_eq!(decimal(&summary["totalExpense"]), Decimal::new(97800, 0));
    assert_eq!(decimal(&summary["profit"]), Decimal::new(177200, 0));
    assert_eq!(summary["monthlySummary"].as_object().unwrap().len(), 3);
}
