use actix_web::dev::ServerHandle;
use actix_web::http::{header, StatusCode};
use actix_web::test::TestRequest;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use finuchet_lib::AppState;
use finuchet_repo::category_repo::NewCategory;
use finuchet_repo::transaction_repo::{Filter, TransactionKind};
use rstest::rstest;
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Mutex;

use utils::{state, tracing_setup, TestUser};

#[macro_use]
mod utils;

macro_rules! create_connection {
    (&$service:ident, $user:ident, $request:expr) => {{
        let (status, body) = call_json!(
            &$service,
            TestRequest::post()
                .uri("/api/connections")
                .cookie($user.cookie())
                .set_json($request)
        );
        assert_eq!(status, StatusCode::OK, "Creating connection failed: {}", body);
        body
    }};
}

#[rstest]
#[actix_rt::test]
async fn key_material_is_hidden(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({
            "name": "Main account",
            "provider": "sberbank",
            "apiKey": "sk-secret",
            "apiSecret": "shh",
            "baseUrl": "https://ignored.example.com",
        })
    );
    assert_eq!(created["provider"], "sberbank");
    assert_eq!(created["isActive"], true);
    assert_eq!(created["baseUrl"], serde_json::Value::Null);
    assert!(created.get("apiKey").is_none());
    assert!(created.get("apiSecret").is_none());

    let stored = state
        .repos
        .connection_repo
        .get_connection(created["id"].as_str().unwrap())
        .await
        .unwrap();
    assert_ne!(stored.api_key, "sk-secret");
    assert_eq!(state.cipher.decrypt(&stored.api_key).unwrap(), "sk-secret");
    assert_eq!(
        state
            .cipher
            .decrypt(stored.api_secret.as_deref().unwrap())
            .unwrap(),
        "shh"
    );

    let (status, listed) = call_json!(
        &service,
        TestRequest::get().uri("/api/connections").cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([created]));
}

#[rstest]
#[case(json!({ "provider": "vtb", "apiKey": "k" }))]
#[case(json!({ "name": "x", "apiKey": "k" }))]
#[case(json!({ "name": "x", "provider": "vtb" }))]
#[case(json!({ "name": "x", "provider": "monzo", "apiKey": "k" }))]
#[case(json!({ "name": "x", "provider": "custom", "apiKey": "k" }))]
#[actix_rt::test]
async fn create_validation(
    _tracing_setup: &(),
    state: AppState,
    #[case] request: serde_json::Value,
) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/connections")
            .cookie(user.cookie())
            .set_json(request)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[rstest]
#[case(json!(false), false)]
#[case(json!("false"), false)]
#[case(json!("true"), true)]
#[actix_rt::test]
async fn update_active_flag(
    _tracing_setup: &(),
    state: AppState,
    #[case] is_active: serde_json::Value,
    #[case] expected: bool,
) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({ "name": "Card", "provider": "tinkoff", "apiKey": "k" })
    );
    let uri = format!("/api/connections/{}", created["id"].as_str().unwrap());

    let (status, updated) = call_json!(
        &service,
        TestRequest::patch()
            .uri(&uri)
            .cookie(user.cookie())
            .set_json(json!({ "name": "Credit card", "isActive": is_active }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Credit card");
    assert_eq!(updated["isActive"], expected);
}

#[rstest]
#[actix_rt::test]
async fn update_rejects_bad_flag(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({ "name": "Card", "provider": "tinkoff", "apiKey": "k" })
    );
    let uri = format!("/api/connections/{}", created["id"].as_str().unwrap());

    let (status, _) = call_json!(
        &service,
        TestRequest::patch()
            .uri(&uri)
            .cookie(user.cookie())
            .set_json(json!({ "name": "Card", "isActive": "maybe" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call_json!(
        &service,
        TestRequest::patch()
            .uri(&uri)
            .cookie(user.cookie())
            .set_json(json!({ "isActive": true }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_rt::test]
async fn sync_imports_once(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let salary = state
        .repos
        .category_repo
        .create_category(
            &user.user_id,
            NewCategory::new("Salary".to_owned(), TransactionKind::Income, None, None),
        )
        .await
        .unwrap();
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({ "name": "Main", "provider": "sberbank", "apiKey": "k" })
    );
    let uri = format!("/api/connections/{}/sync", created["id"].as_str().unwrap());

    let (status, body) = call_json!(
        &service,
        TestRequest::post().uri(&uri).cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["syncedTransactions"], 2);

    let (status, body) = call_json!(
        &service,
        TestRequest::post().uri(&uri).cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["syncedTransactions"], 0);

    let transactions = state
        .repos
        .transaction_repo
        .get_transactions(&user.user_id, Filter::NONE)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 2);
    let income = transactions
        .iter()
        .find(|t| t.kind == TransactionKind::Income)
        .unwrap();
    assert_eq!(income.category_id.as_deref(), Some(salary.id.as_str()));
    assert_eq!(income.external_id.as_deref(), Some("sb1"));
    let expense = transactions
        .iter()
        .find(|t| t.kind == TransactionKind::Expense)
        .unwrap();
    assert!(expense.amount.is_sign_positive());
    assert_eq!(expense.category_id, None);

    let connection = state
        .repos
        .connection_repo
        .get_connection(created["id"].as_str().unwrap())
        .await
        .unwrap();
    assert!(connection.last_sync_at.is_some());
}

/// Bank API of a custom provider, remembering the ranges it was asked for
#[derive(Default)]
struct CustomBank {
    ranges: Mutex<Vec<(String, String)>>,
}

async fn custom_statement(
    bank: web::Data<CustomBank>,
    request: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if authorization != Some("Bearer custom-key") {
        return HttpResponse::Unauthorized().finish();
    }
    let (Some(from), Some(to)) = (query.get("from"), query.get("to")) else {
        return HttpResponse::BadRequest().finish();
    };
    bank.ranges
        .lock()
        .unwrap()
        .push((from.clone(), to.clone()));
    HttpResponse::Ok().json(json!({ "transactions": [
        { "id": "c1", "amount": "-20.00", "date": to, "category": "Groceries" },
        { "id": "c2", "amount": "100", "date": to, "category": "Groceries" },
        { "id": "c3", "amount": "0", "date": to, "category": "Groceries" },
    ]}))
}

fn start_custom_bank(bank: web::Data<CustomBank>) -> (String, ServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(bank.clone())
            .route("/api/transactions", web::get().to(custom_statement))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    let handle = server.handle();
    actix_rt::spawn(server);
    (base, handle)
}

#[rstest]
#[actix_rt::test]
async fn sync_custom_provider(_tracing_setup: &(), state: AppState) {
    let bank = web::Data::new(CustomBank::default());
    let (base, server) = start_custom_bank(bank.clone());
    let user = TestUser::new(&state).await;
    let groceries = state
        .repos
        .category_repo
        .create_category(
            &user.user_id,
            NewCategory::new("Groceries".to_owned(), TransactionKind::Expense, None, None),
        )
        .await
        .unwrap();
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({
            "name": "Own bank",
            "provider": "custom",
            "apiKey": "custom-key",
            "baseUrl": base,
        })
    );
    let uri = format!("/api/connections/{}/sync", created["id"].as_str().unwrap());

    let (status, body) = call_json!(
        &service,
        TestRequest::post().uri(&uri).cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["syncedTransactions"], 2);

    let ranges = bank.ranges.lock().unwrap().clone();
    assert_eq!(ranges.len(), 1);
    let (from, to) = &ranges[0];
    assert!(from < to, "{} .. {}", from, to);

    let transactions = state
        .repos
        .transaction_repo
        .get_transactions(&user.user_id, Filter::NONE)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 2);
    let expense = transactions
        .iter()
        .find(|t| t.kind == TransactionKind::Expense)
        .unwrap();
    assert_eq!(expense.category_id.as_deref(), Some(groceries.id.as_str()));
    assert_eq!(expense.external_id.as_deref(), Some("c1"));
    assert_eq!(expense.date.to_string(), *to);
    // Only an expense category of that name exists
    let income = transactions
        .iter()
        .find(|t| t.kind == TransactionKind::Income)
        .unwrap();
    assert_eq!(income.category_id, None);

    let (_, body) = call_json!(
        &service,
        TestRequest::post().uri(&uri).cookie(user.cookie())
    );
    assert_eq!(body["syncedTransactions"], 0);
    let ranges = bank.ranges.lock().unwrap().clone();
    assert_eq!(ranges[1].0, ranges[1].1);

    server.stop(true).await;
}

#[rstest]
#[actix_rt::test]
async fn sync_inactive(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({ "name": "Main", "provider": "vtb", "apiKey": "k" })
    );
    let id = created["id"].as_str().unwrap();
    let (status, _) = call_json!(
        &service,
        TestRequest::patch()
            .uri(&format!("/api/connections/{}", id))
            .cookie(user.cookie())
            .set_json(json!({ "name": "Main", "isActive": false }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri(&format!("/api/connections/{}/sync", id))
            .cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "API connection is inactive");
}

#[rstest]
#[actix_rt::test]
async fn sync_upstream_failure(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        user,
        json!({
            "name": "Own bank",
            "provider": "custom",
            "apiKey": "k",
            "baseUrl": "http://127.0.0.1:9",
        })
    );
    assert_eq!(created["baseUrl"], "http://127.0.0.1:9");

    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri(&format!(
                "/api/connections/{}/sync",
                created["id"].as_str().unwrap()
            ))
            .cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to sync with bank API");
    assert!(body["details"].is_string());
}

#[rstest]
#[actix_rt::test]
async fn foreign_connection(_tracing_setup: &(), state: AppState) {
    let owner = TestUser::new(&state).await;
    let other = TestUser::new(&state).await;
    let service = build_app!(state);

    let created = create_connection!(
        &service,
        owner,
        json!({ "name": "Main", "provider": "alfabank", "apiKey": "k" })
    );
    let uri = format!("/api/connections/{}", created["id"].as_str().unwrap());

    let (status, _) = call_json!(
        &service,
        TestRequest::post()
            .uri(&format!("{}/sync", uri))
            .cookie(other.cookie())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call_json!(
        &service,
        TestRequest::delete().uri(&uri).cookie(other.cookie())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call_json!(
        &service,
        TestRequest::delete().uri(&uri).cookie(owner.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = call_json!(
        &service,
        TestRequest::get().uri(&uri).cookie(owner.cookie())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "API connection not found");
}
