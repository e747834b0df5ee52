#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use farmstead::app::ports::{PushSendError, PushTransport};
use farmstead::domain::PushSubscription;
use farmstead::infra::jwt_auth::JwtAuth;
use farmstead::server::{create_server, AppState};
use farmstead::storage::InMemoryStorage;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const CRON_SECRET: &str = "test-cron-secret";

/// Push transport that records every payload it is handed.
#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl PushTransport for RecordingPush {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> std::result::Result<(), PushSendError> {
        let body: Value = serde_json::from_slice(payload).map_err(|e| PushSendError::Failed(e.to_string()))?;
        self.sent.lock().await.push((subscription.endpoint.clone(), body));
        if subscription.endpoint.ends_with("/gone") {
            return Err(PushSendError::Gone);
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: Arc<InMemoryStorage>,
    pub push: Arc<RecordingPush>,
}

pub fn app() -> TestApp {
    let storage = Arc::new(InMemoryStorage::new());
    let push = Arc::new(RecordingPush::default());
    let state = AppState {
        storage: storage.clone(),
        auth: Arc::new(JwtAuth::new(JWT_SECRET)),
        push: push.clone(),
        cron_secret: Some(CRON_SECRET.to_string()),
        batch_size: 50,
        app_base_url: "https://farm.test".to_string(),
    };
    TestApp { router: create_server(state), storage, push }
}

pub struct User {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub fn user(email: &str) -> User {
    let id = Uuid::new_v4();
    let claims = json!({
        "sub": id.to_string(),
        "email": email,
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .expect("token encodes");
    User { id, email: email.to_string(), token }
}

impl TestApp {
    pub async fn call(&self, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let (status, bytes) = self.raw(method, uri, bearer, body).await?;
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, value))
    }

    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await?;
        Ok((status, bytes.to_vec()))
    }

    pub async fn get(&self, uri: &str, user: &User) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &User, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    /// Creates an organization owned by `owner` and returns its id.
    pub async fn organization(&self, owner: &User, name: &str) -> Result<String> {
        let (status, org) = self.post("/api/orgs", owner, json!({ "name": name })).await?;
        assert_eq!(status, StatusCode::CREATED, "{}", org);
        Ok(org["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn animal(&self, org: &str, owner: &User, kind: &str, ear_tag: &str) -> Result<String> {
        let (status, animal) = self
            .post(&format!("/api/orgs/{}/animals", org), owner, json!({ "kind": kind, "ear_tag": ear_tag }))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{}", animal);
        Ok(animal["id"].as_str().unwrap_or_default().to_string())
    }
}
