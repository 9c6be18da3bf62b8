//! Common test utilities for API tests
//!
//! Builds the full router over the in-memory handover store, so these tests
//! need no database.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use handover_api::{
    app::{build_router, AppState},
    config::ApiConfig,
};
use handover_shared::{models::user::UserProfile, store::memory::MemoryHandoverDatabase};
use serde_json::Value;
use tower::Service as _;

/// Test context with a seeded user directory
pub struct TestContext {
    pub db: MemoryHandoverDatabase,
    pub app: Router,
    pub users: Vec<UserProfile>,
}

impl TestContext {
    /// Router over a fresh store with users Hong, Kim, Lee and Park
    pub async fn new() -> Self {
        let db = MemoryHandoverDatabase::new();
        let mut users = Vec::new();
        for name in ["Hong", "Kim", "Lee", "Park"] {
            users.push(db.add_user(name).await);
        }

        let app = build_router(AppState::new(db.clone(), ApiConfig::default()));

        Self { db, app, users }
    }

    /// Sends a request and returns the status and the JSON body
    ///
    /// Non-JSON bodies (e.g. extractor rejections) come back as `Value::Null`.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .call(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    /// Creates a note through the API and returns its id
    pub async fn create_note(&self, author: usize, recipients: &[usize], title: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/handovers",
                Some(serde_json::json!({
                    "author_id": self.users[author].id,
                    "recipient_ids": recipients.iter().map(|i| self.users[*i].id).collect::<Vec<_>>(),
                    "title": title,
                    "content": format!("{} body", title),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);

        body["handover_id"].as_i64().unwrap()
    }
}
