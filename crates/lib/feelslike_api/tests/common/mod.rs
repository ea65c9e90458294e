//! Shared fixtures for the API integration tests: an in-memory store, a
//! temporary uploads directory and a stub federated verifier.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use feelslike_api::config::ApiConfig;
use feelslike_api::{AppState, router};
use feelslike_core::auth::federated::{FederatedError, FederatedIdentity, IdentityVerifier};
use feelslike_core::auth::password::DecoyHash;
use feelslike_core::auth::token::TokenConfig;
use feelslike_core::media::DiskMediaStore;
use feelslike_core::store::MemoryStore;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_AUDIENCE: &str = "test-client-id";
const BOUNDARY: &str = "feelslike-test-boundary";

/// Accepts credentials of the form `valid:<email>:<name>`.
pub struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(
        &self,
        credential: &str,
        audience: &str,
    ) -> Result<FederatedIdentity, FederatedError> {
        if audience != TEST_AUDIENCE {
            return Err(FederatedError::Rejected("audience mismatch".into()));
        }
        match credential.split(':').collect::<Vec<_>>().as_slice() {
            ["valid", email, name] => Ok(FederatedIdentity {
                email: email.to_string(),
                name: Some(name.to_string()),
                picture: None,
            }),
            _ => Err(FederatedError::Rejected("bad credential".into())),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub password_decoy: Arc<DecoyHash>,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("tempdir");
        let store = MemoryStore::new();
        let config = ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: String::new(),
            tokens: TokenConfig::new(TEST_SECRET),
            google_client_id: TEST_AUDIENCE.into(),
            uploads_dir: uploads.path().to_path_buf(),
            bcrypt_cost: 4,
        };
        let media = DiskMediaStore::new(uploads.path(), reqwest::Client::new());
        let state = AppState::new(
            config,
            Arc::new(store.clone()),
            Arc::new(media),
            Arc::new(StubVerifier),
        )
        .expect("app state");

        Self {
            password_decoy: state.password_decoy.clone(),
            router: router(state),
            store,
            uploads,
        }
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let req = request(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        let req = request(method, uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(req).await
    }

    /// Sign up `email` with a small avatar and return the token response.
    pub async fn signup(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .multipart(
                Method::POST,
                "/auth/signup",
                None,
                &[
                    Part::Text("email", email),
                    Part::Text("password", password),
                    Part::Text("fullName", "Test User"),
                    Part::File("avatar", "me.png", b"\x89PNG avatar"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        body
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/auth/login",
            None,
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/auth/refresh",
            None,
            serde_json::json!({ "refreshToken": refresh_token }),
        )
        .await
    }

    /// Create a post as the holder of `token` and return its id.
    pub async fn create_post(&self, token: &str, content: &str) -> String {
        let (status, body) = self
            .multipart(
                Method::POST,
                "/posts",
                Some(token),
                &[
                    Part::Text("content", content),
                    Part::File("image", "sky.jpg", b"jpeg bytes"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");
        body["id"].as_str().expect("post id").to_string()
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body[key]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field {key} in {body}"))
}
