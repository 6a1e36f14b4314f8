#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use potluck::auth::AccountManager;
use potluck::config::Config;
use potluck::db::{self, models::Account};
use potluck::routes;
use potluck::state::AppState;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _tmp: TempDir,
}

/// Fresh database and uploads directory in a temp dir, cheap password hashing.
pub fn test_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.auth.hash_cost = 4;
    config.resolve_paths(tmp.path());

    let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let state = AppState { db: pool, config };
    let router = routes::app(state.clone());
    TestApp {
        state,
        router,
        _tmp: tmp,
    }
}

impl TestApp {
    pub fn create_user(&self, email: &str, name: &str, password: &str) -> Account {
        let conn = self.state.db.get().unwrap();
        AccountManager::new(&conn, 4)
            .create_account(email, name, Some(password))
            .unwrap()
    }

    pub fn create_staff(&self, email: &str) -> Account {
        let conn = self.state.db.get().unwrap();
        AccountManager::new(&conn, 4)
            .create_privileged_account(email, "Staff", "testing321")
            .unwrap()
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/login/",
                None,
                Some(serde_json::json!({ "username": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Create an account and log it in, returning (account id, token).
    pub async fn user_with_token(&self, email: &str) -> (String, String) {
        let account = self.create_user(email, email, "testing321");
        let token = self.login(email, "testing321").await;
        (account.id, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.request(builder.body(body).unwrap()).await
    }

    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.raw(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// Build a multipart/form-data body with a single file field.
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "potluck-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
