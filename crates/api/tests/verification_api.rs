//! End-to-end tests for identity verification: upload a mandate, open a
//! signature session, submit the captures from the "phone", and read back
//! the signed document.

mod common;

use std::path::PathBuf;

use axum::http::StatusCode;
use common::{
    auth_token, body_bytes, body_json, capture_parts, file_part, get, get_auth, one_page_pdf,
    pdf_page_count, post_json_auth, post_multipart, seed_advisor, seed_client, text_part, Part,
    TestApp,
};
use gervis_core::storage::client_dir;
use gervis_db::repositories::{ClientLogRepo, SignatureSessionRepo, VerifiedDocumentRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct OpenSession {
    session_id: String,
    token: String,
}

async fn upload_pdf(app: &TestApp, advisor_token: &str, client_id: i64, pdf: Vec<u8>) -> String {
    let response = post_multipart(
        app.app(),
        &format!("/api/v1/clients/{client_id}/documents"),
        &[file_part("file", "mandate.pdf", "application/pdf", pdf)],
        Some(advisor_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["document_url"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn open_session(
    app: &TestApp,
    advisor_token: &str,
    client_id: i64,
    document_url: Option<&str>,
) -> OpenSession {
    let response = post_json_auth(
        app.app(),
        "/api/v1/signature-sessions",
        serde_json::json!({ "client_id": client_id, "document_url": document_url }),
        advisor_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    OpenSession {
        session_id: json["data"]["session_id"].as_str().unwrap().to_string(),
        token: json["data"]["token"].as_str().unwrap().to_string(),
    }
}

fn verification_parts(session: &OpenSession) -> Vec<Part> {
    let mut parts = vec![
        text_part("sessionId", &session.session_id),
        text_part("token", &session.token),
    ];
    parts.extend(capture_parts());
    parts
}

async fn verify(app: &TestApp, parts: &[Part]) -> axum::response::Response {
    post_multipart(app.app(), "/api/v1/verify-identity", parts, None).await
}

async fn status(app: &TestApp, session: &OpenSession) -> serde_json::Value {
    let response = get(
        app.app(),
        &format!(
            "/api/v1/signature-sessions/{}/status?token={}",
            session.session_id, session.token
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn stored_files(app: &TestApp, client_id: i64) -> Vec<PathBuf> {
    match std::fs::read_dir(client_dir(app.storage.path(), client_id)) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn verification_signs_uploaded_document(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, Some("mario@example.com")).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);

    let original_url = upload_pdf(&app, &token, client.id, one_page_pdf()).await;
    let session = open_session(&app, &token, client.id, Some(&original_url)).await;

    let response = verify(&app, &verification_parts(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["success"], true);
    assert!(json["data"]["verification_date"].is_string());
    let signed_url = json["data"]["document_url"].as_str().unwrap().to_string();
    assert_ne!(signed_url, original_url);
    assert!(signed_url.starts_with(&format!("/api/v1/secured-files/{}/signed_", client.id)));

    // The signed copy carries the attestation page.
    let response = get_auth(app.app(), &signed_url, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    let signed = body_bytes(response).await;
    assert_eq!(pdf_page_count(&signed), 2);

    // The original is untouched.
    let response = get_auth(app.app(), &original_url, &token).await;
    assert_eq!(pdf_page_count(&body_bytes(response).await), 1);

    let json = status(&app, &session).await;
    assert_eq!(json["data"]["status"], "completed");
    assert!(json["data"]["completed_at"].is_string());

    // Three captures, the original, and the signed copy. No temporaries.
    let files = stored_files(&app, client.id);
    assert_eq!(files.len(), 5, "unexpected files: {files:?}");

    let documents = VerifiedDocumentRepo::list_by_client(&pool, client.id).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].token_used, session.token);
    assert_eq!(documents[0].document_url.as_deref(), Some(signed_url.as_str()));
    assert!(documents[0].selfie_url.contains("/selfie_"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_submission_is_already_verified(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    let first = verify(&app, &verification_parts(&session)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let files_after_first = stored_files(&app, client.id).len();

    let second = verify(&app, &verification_parts(&session)).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["already_verified"], true);

    assert_eq!(stored_files(&app, client.id).len(), files_after_first);
    assert_eq!(
        VerifiedDocumentRepo::list_by_client(&pool, client.id).await.unwrap().len(),
        1
    );

    let response = get(
        app.app(),
        &format!(
            "/api/v1/signature-sessions/{}?token={}",
            session.session_id, session.token
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["status"], "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn session_without_document_records_no_document(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    let response = verify(&app, &verification_parts(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["document_url"].is_null());
    assert_eq!(stored_files(&app, client.id).len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unreadable_pdf_falls_back_to_plain_copy(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);

    let broken = b"%PDF-1.4\nthis is not really a pdf\n%%EOF\n".to_vec();
    let original_url = upload_pdf(&app, &token, client.id, broken.clone()).await;
    let session = open_session(&app, &token, client.id, Some(&original_url)).await;

    let response = verify(&app, &verification_parts(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let signed_url = body_json(response).await["data"]["document_url"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(signed_url, original_url);

    let response = get_auth(app.app(), &signed_url, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, broken);
    assert_eq!(stored_files(&app, client.id).len(), 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn public_document_is_signed_end_to_end(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);

    let public_docs = app.storage.path().join("public").join("docs");
    std::fs::create_dir_all(&public_docs).unwrap();
    std::fs::write(public_docs.join("a.pdf"), one_page_pdf()).unwrap();

    let session = open_session(&app, &token, client.id, Some("/docs/a.pdf")).await;
    assert_eq!(status(&app, &session).await["data"]["status"], "valid");

    let response = verify(&app, &verification_parts(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["success"], true);
    let signed_url = json["data"]["document_url"].as_str().unwrap().to_string();
    assert_ne!(signed_url, "/docs/a.pdf");
    assert!(signed_url.contains("/signed_a_"));
    let response = get_auth(app.app(), &signed_url, &token).await;
    assert_eq!(pdf_page_count(&body_bytes(response).await), 2);

    assert_eq!(status(&app, &session).await["data"]["status"], "completed");

    let response = verify(&app, &verification_parts(&session)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["already_verified"], true);
    assert_eq!(
        VerifiedDocumentRepo::list_by_client(&pool, client.id).await.unwrap().len(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_source_document_keeps_original_url(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, Some("/docs/missing.pdf")).await;

    let response = verify(&app, &verification_parts(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["document_url"],
        "/docs/missing.pdf"
    );
    assert_eq!(stored_files(&app, client.id).len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn racing_submissions_produce_one_document(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    let parts_a = verification_parts(&session);
    let parts_b = verification_parts(&session);
    let (a, b) = tokio::join!(verify(&app, &parts_a), verify(&app, &parts_b));

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(
        VerifiedDocumentRepo::list_by_client(&pool, client.id).await.unwrap().len(),
        1
    );
    assert_eq!(stored_files(&app, client.id).len(), 3);

    let logs = ClientLogRepo::list_by_client(&pool, client.id).await.unwrap();
    let verified = logs.iter().filter(|l| l.log_type == "identity_verified").count();
    assert_eq!(verified, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_log_write_leaves_session_pending(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    sqlx::query("DROP TABLE client_logs").execute(&pool).await.unwrap();
    let response = verify(&app, &verification_parts(&session)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status(&app, &session).await["data"]["status"], "valid");
    assert!(VerifiedDocumentRepo::find_by_session_id(&pool, &session.session_id)
        .await
        .unwrap()
        .is_none());
    assert!(stored_files(&app, client.id).is_empty());
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_capture_is_rejected_without_side_effects(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    let parts = vec![
        text_part("sessionId", &session.session_id),
        text_part("token", &session.token),
        file_part("idFront", "front.jpg", "image/jpeg", common::jpeg_bytes()),
    ];
    let response = verify(&app, &parts).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("idBack") && message.contains("selfie"));
    assert!(stored_files(&app, client.id).is_empty());
    assert_eq!(status(&app, &session).await["data"]["status"], "valid");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_image_capture_is_rejected(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    let parts = vec![
        text_part("sessionId", &session.session_id),
        text_part("token", &session.token),
        file_part("idFront", "front.jpg", "image/jpeg", common::jpeg_bytes()),
        file_part("idBack", "back.txt", "text/plain", b"hello".to_vec()),
        file_part("selfie", "selfie.png", "image/png", common::png_bytes()),
    ];
    let response = verify(&app, &parts).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(stored_files(&app, client.id).is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_token_is_unauthorized(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;

    let forged = OpenSession {
        session_id: session.session_id.clone(),
        token: "f".repeat(64),
    };
    let response = verify(&app, &verification_parts(&forged)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(stored_files(&app, client.id).is_empty());
    assert_eq!(status(&app, &session).await["data"]["status"], "valid");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_session_is_invalid_link(pool: PgPool) {
    let app = common::build_test_app(pool);
    let ghost = OpenSession {
        session_id: "sig-0-nothinghere".to_string(),
        token: "a".repeat(64),
    };

    let response = verify(&app, &verification_parts(&ghost)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "INVALID_LINK");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_session_is_gone_and_stays_expired(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool.clone());
    let token = auth_token(&app, &advisor);
    let session = open_session(&app, &token, client.id, None).await;
    sqlx::query(
        "UPDATE signature_sessions SET expires_at = NOW() - INTERVAL '1 second'
         WHERE session_id = $1",
    )
    .bind(&session.session_id)
    .execute(&pool)
    .await
    .unwrap();

    let response = verify(&app, &verification_parts(&session)).await;
    assert_eq!(response.status(), StatusCode::GONE);

    // Expiry is now stored, so the second attempt fails on the stored status.
    let response = verify(&app, &verification_parts(&session)).await;
    assert_eq!(response.status(), StatusCode::GONE);

    let stored = SignatureSessionRepo::find_by_session_id(&pool, &session.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status_id, 3);
    assert!(stored.completed_at.is_none());
    assert!(stored_files(&app, client.id).is_empty());
}

// ---------------------------------------------------------------------------
// Advisor listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn verified_documents_are_listed_newest_first(pool: PgPool) {
    let advisor = seed_advisor(&pool, "giulia@studio.test").await;
    let client = seed_client(&pool, advisor.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &advisor);

    let first = open_session(&app, &token, client.id, None).await;
    let second = open_session(&app, &token, client.id, None).await;
    assert_eq!(verify(&app, &verification_parts(&first)).await.status(), StatusCode::OK);
    assert_eq!(verify(&app, &verification_parts(&second)).await.status(), StatusCode::OK);

    let response = get_auth(
        app.app(),
        &format!("/api/v1/verified-documents/{}", client.id),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let documents = json["data"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["session_id"], second.session_id.as_str());
    assert_eq!(documents[1]["session_id"], first.session_id.as_str());
    assert!(documents[0].get("token_used").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn verified_documents_of_foreign_client_are_forbidden(pool: PgPool) {
    let owner = seed_advisor(&pool, "owner@studio.test").await;
    let other = seed_advisor(&pool, "other@studio.test").await;
    let client = seed_client(&pool, owner.id, None).await;
    let app = common::build_test_app(pool);
    let token = auth_token(&app, &other);

    let response = get_auth(
        app.app(),
        &format!("/api/v1/verified-documents/{}", client.id),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
