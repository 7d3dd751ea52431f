use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use universe_canvas::auth::{digest, generate_token};
use universe_canvas::content::{ContentService, RecordingRevalidator, RelatedConfig};
use universe_canvas::server::{AppState, create_router};
use universe_canvas::store::{SqliteStore, Store};

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).expect("response is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response is UTF-8")
    }
}

/// The full router over a file-backed database in a temp dir.
pub struct TestApp {
    pub router: Router,
    pub admin_token: String,
    pub revalidator: Arc<RecordingRevalidator>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("canvas.db")).expect("open store");
        store.initialize().expect("initialize store");

        let revalidator = Arc::new(RecordingRevalidator::default());
        let content = ContentService::new(
            Arc::new(store),
            revalidator.clone(),
            RelatedConfig::default(),
        );

        let admin_token = generate_token();
        let state = Arc::new(AppState::new(content, Some(digest(&admin_token))));

        Self {
            router: create_router(state),
            admin_token,
            revalidator,
            _temp_dir: temp_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token));

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Creates a resource through the admin API and returns its `data`.
    pub async fn create(&self, uri: &str, body: Value) -> Value {
        let response = self.admin(Method::POST, uri, Some(body)).await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "POST {uri}: {}",
            response.text()
        );
        response.json()["data"].clone()
    }
}
