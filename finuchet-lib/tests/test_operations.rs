use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use finuchet_lib::AppState;
use finuchet_repo::user_repo::Role;
use rstest::rstest;
use serde_json::json;

use utils::{state, state_with_config, test_config, tracing_setup, TestUser};

#[macro_use]
mod utils;

#[rstest]
#[actix_rt::test]
async fn storage_status(_tracing_setup: &(), state: AppState) {
    let service = build_app!(state);

    let (status, body) = call_json!(&service, TestRequest::get().uri("/api/storage-status"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentMode"], "memory");
    assert_eq!(
        body["tiers"],
        json!([{ "kind": "memory", "available": true, "lastError": null }])
    );
}

#[rstest]
#[actix_rt::test]
async fn probe_needs_session(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, _) = call_json!(
        &service,
        TestRequest::post().uri("/api/storage-status/probe")
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/storage-status/probe")
            .cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["kind"], "memory");
    assert_eq!(body["results"][0]["success"], true);
}

#[rstest]
#[actix_rt::test]
async fn health(_tracing_setup: &(), state: AppState) {
    let service = build_app!(state);
    let (status, body) = call_json!(&service, TestRequest::get().uri("/api/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[rstest]
#[actix_rt::test]
async fn seed(_tracing_setup: &(), state: AppState) {
    let service = build_app!(state);

    let (status, body) = call_json!(&service, TestRequest::post().uri("/api/seed"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["createdUsers"].as_array().unwrap().len(), 2);
    assert_eq!(body["createdCategories"], 10);

    let (status, body) = call_json!(&service, TestRequest::post().uri("/api/seed"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["createdUsers"], json!([]));
    assert_eq!(body["createdCategories"], 0);

    let admin = state
        .repos
        .user_repo
        .get_user_by_email("admin@example.com")
        .await
        .unwrap();
    assert_eq!(admin.role, Role::Admin);

    let (status, body) = call_json!(
        &service,
        TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "demo@example.com",
            "password": "demo-password",
        }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Demo User");
}

#[rstest]
#[actix_rt::test]
async fn seed_not_configured(_tracing_setup: &()) {
    let mut config = test_config();
    config.seed = None;
    let state = state_with_config(&config);
    let service = build_app!(state);

    let (status, body) = call_json!(&service, TestRequest::post().uri("/api/seed"));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied");
}

#[rstest]
#[actix_rt::test]
async fn categories(_tracing_setup: &(), state: AppState) {
    let user = TestUser::new(&state).await;
    let other = TestUser::new(&state).await;
    let service = build_app!(state);

    let (status, created) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/categories")
            .cookie(user.cookie())
            .set_json(json!({ "name": "Rent", "type": "EXPENSE", "color": "#607D8B" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "Rent");

    let (status, body) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/categories")
            .cookie(user.cookie())
            .set_json(json!({ "name": "Rent", "type": "EXPENSE" }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, _) = call_json!(
        &service,
        TestRequest::post()
            .uri("/api/categories")
            .cookie(user.cookie())
            .set_json(json!({ "name": "Rent", "type": "INCOME" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, expenses) = call_json!(
        &service,
        TestRequest::get()
            .uri("/api/categories?type=expense")
            .cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expenses.as_array().unwrap().len(), 1);

    let uri = format!("/api/categories/{}", created["id"].as_str().unwrap());
    let (status, _) = call_json!(
        &service,
        TestRequest::delete().uri(&uri).cookie(other.cookie())
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, deleted) = call_json!(
        &service,
        TestRequest::delete().uri(&uri).cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], created["id"]);

    let (status, _) = call_json!(
        &service,
        TestRequest::delete().uri(&uri).cookie(user.cookie())
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}
