#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use gervis_api::auth::jwt::JwtConfig;
use gervis_api::auth::password::hash_password;
use gervis_api::config::ServerConfig;
use gervis_api::router::build_app_router;
use gervis_api::state::AppState;
use gervis_core::credentials::CredentialSealer;
use gervis_db::models::client::{Client, CreateClient};
use gervis_db::models::user::{CreateUser, User};
use gervis_db::repositories::{ClientRepo, UserRepo};
use gervis_mail::{EmailError, Mailer, OutgoingEmail, SmtpTransportSettings};

pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const PUBLIC_BASE_URL: &str = "https://app.gervis.test";

// ---------------------------------------------------------------------------
// Mailers
// ---------------------------------------------------------------------------

/// Records every email instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, OutgoingEmail)>>,
}

impl RecordingMailer {
    /// `(smtp host, email)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, OutgoingEmail)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        settings: &SmtpTransportSettings,
        email: &OutgoingEmail,
    ) -> Result<(), EmailError> {
        self.sent
            .lock()
            .unwrap()
            .push((settings.host.clone(), email.clone()));
        Ok(())
    }
}

/// Fails every send, like an unreachable SMTP server.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(
        &self,
        _settings: &SmtpTransportSettings,
        _email: &OutgoingEmail,
    ) -> Result<(), EmailError> {
        Err(EmailError::Build("connection refused".to_string()))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A router over a private storage directory.
///
/// The directory is deleted when the value is dropped, so keep it alive for
/// the whole test.
pub struct TestApp {
    pub router: Router,
    pub storage: TempDir,
    pub mailer: Arc<RecordingMailer>,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Test `ServerConfig` rooted at `storage_root`.
pub fn test_config(storage_root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        public_base_url: PUBLIC_BASE_URL.to_string(),
        storage_root: storage_root.to_path_buf(),
        onboarding_token_ttl_days: 30,
        credentials_key: "integration-test-credentials".to_string(),
        max_upload_bytes: 10 * 1024 * 1024,
    }
}

/// Build the full application router with a recording mailer.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    let (router, storage, config) = assemble(pool, mailer.clone());
    TestApp {
        router,
        storage,
        mailer,
        config,
    }
}

/// Build the application with an arbitrary mailer.
pub fn build_test_app_with_mailer(pool: PgPool, mailer: Arc<dyn Mailer>) -> TestApp {
    let (router, storage, config) = assemble(pool, mailer);
    TestApp {
        router,
        storage,
        mailer: Arc::new(RecordingMailer::default()),
        config,
    }
}

fn assemble(pool: PgPool, mailer: Arc<dyn Mailer>) -> (Router, TempDir, ServerConfig) {
    let storage = TempDir::new().expect("temp storage dir");
    let config = test_config(storage.path());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        mailer,
        sealer: Arc::new(CredentialSealer::from_secret(&config.credentials_key)),
    };
    (build_app_router(state, &config), storage, config)
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub async fn seed_advisor(pool: &PgPool, email: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            full_name: "Giulia Bianchi".to_string(),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        },
    )
    .await
    .expect("advisor creation should succeed")
}

pub async fn seed_client(pool: &PgPool, advisor_id: i64, email: Option<&str>) -> Client {
    ClientRepo::create(
        pool,
        &CreateClient {
            advisor_id,
            first_name: "Mario".to_string(),
            last_name: "Rossi".to_string(),
            email: email.map(str::to_string),
            phone: Some("+39 333 1234567".to_string()),
        },
    )
    .await
    .expect("client creation should succeed")
}

/// Access token for `user`, signed with the test secret.
pub fn auth_token(app: &TestApp, user: &User) -> String {
    app.config
        .jwt
        .issue_access_token(user.id, &user.role)
        .expect("token generation")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    json_request(app, Method::POST, uri, body, None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    json_request(app, Method::POST, uri, body, Some(token)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    json_request(app, Method::PUT, uri, body, Some(token)).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "gervis-test-boundary-7MA4YWxkTrZu0gW";

/// One `multipart/form-data` part.
pub struct Part {
    pub name: &'static str,
    pub filename: Option<&'static str>,
    pub content_type: Option<&'static str>,
    pub data: Vec<u8>,
}

pub fn text_part(name: &'static str, value: &str) -> Part {
    Part {
        name,
        filename: None,
        content_type: None,
        data: value.as_bytes().to_vec(),
    }
}

pub fn file_part(
    name: &'static str,
    filename: &'static str,
    content_type: &'static str,
    data: Vec<u8>,
) -> Part {
    Part {
        name,
        filename: Some(filename),
        content_type: Some(content_type),
        data,
    }
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(
    app: Router,
    uri: &str,
    parts: &[Part],
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(multipart_body(parts))).unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Bytes carrying a PNG signature.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}

/// Bytes carrying a JPEG signature.
pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(&[0u8; 32]);
    bytes
}

/// The three identity captures with valid image signatures.
pub fn capture_parts() -> Vec<Part> {
    vec![
        file_part("idFront", "front.jpg", "image/jpeg", jpeg_bytes()),
        file_part("idBack", "back.jpg", "image/jpeg", jpeg_bytes()),
        file_part("selfie", "selfie.png", "image/png", png_bytes()),
    ]
}

/// A one-page PDF built with lopdf.
pub fn one_page_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 18.into()]),
            Operation::new("Td", vec![72.into(), 760.into()]),
            Operation::new("Tj", vec![Object::string_literal("Mandato di consulenza")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf should serialize");
    bytes
}

pub fn pdf_page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes)
        .expect("pdf should parse")
        .get_pages()
        .len()
}

pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
