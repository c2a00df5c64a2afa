//! Integration tests for the advisor's SMTP settings.

mod common;

use axum::http::StatusCode;
use common::{auth_token, body_json, delete_auth, get_auth, put_json_auth, seed_advisor};
use gervis_db::repositories::SmtpSettingsRepo;
use sqlx::PgPool;

const URI: &str = "/api/v1/user/smtp-settings";

fn settings(password: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "host": "smtp.studio.test",
        "port": 465,
        "secure": true,
        "username": "giulia",
        "password": password,
        "from_address": "giulia@studio.test",
        "from_name": "Studio Bianchi"
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn settings_round_trip_without_exposing_password(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);

    let response = get_auth(app.app(), URI, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = put_json_auth(app.app(), URI, settings(Some("s3cret")), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["host"], "smtp.studio.test");
    assert_eq!(json["data"]["has_password"], true);
    assert!(json["data"].get("password").is_none());

    let stored = SmtpSettingsRepo::find_by_user(&pool, advisor.id)
        .await
        .unwrap()
        .unwrap();
    let sealed = stored.password_sealed.unwrap();
    assert!(!sealed.windows(6).any(|w| w == b"s3cret"));

    let response = get_auth(app.app(), URI, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["port"], 465);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn omitting_password_keeps_stored_one(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);

    put_json_auth(app.app(), URI, settings(Some("s3cret")), &token).await;
    let mut update = settings(None);
    update["host"] = serde_json::json!("smtp2.studio.test");
    let response = put_json_auth(app.app(), URI, update, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["host"], "smtp2.studio.test");
    assert_eq!(json["data"]["has_password"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_settings_are_rejected(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);

    let mut body = settings(None);
    body["from_address"] = serde_json::json!("not an address");
    let response = put_json_auth(app.app(), URI, body, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_settings(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);

    put_json_auth(app.app(), URI, settings(Some("s3cret")), &token).await;

    let response = delete_auth(app.app(), URI, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(app.app(), URI, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
