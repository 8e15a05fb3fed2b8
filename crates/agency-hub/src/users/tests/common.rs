use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::{body::Body, Router};
use serde_json::Value;
use tower::ServiceExt;

use crate::users::domain::{LoginRequest, SignupRequest};
use crate::users::{user_router, AuthService, InMemoryUserRepository, TokenSigner};

pub(super) const SECRET: &str = "unit-test-secret";

/// Cheapest cost bcrypt accepts; keeps hashing fast in tests.
const TEST_HASH_COST: u32 = 4;

pub(super) fn service() -> Arc<AuthService<InMemoryUserRepository>> {
    service_with(Arc::new(InMemoryUserRepository::default()), Some(SECRET))
}

pub(super) fn service_with(
    users: Arc<InMemoryUserRepository>,
    secret: Option<&str>,
) -> Arc<AuthService<InMemoryUserRepository>> {
    let signer = secret.map(|secret| TokenSigner::new(secret, 24));
    Arc::new(AuthService::new(users, signer).with_hash_cost(TEST_HASH_COST))
}

pub(super) fn signup(email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        username: Some("agent".to_string()),
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

pub(super) fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

pub(super) fn router(service: Arc<AuthService<InMemoryUserRepository>>) -> Router {
    user_router(service)
}

pub(super) async fn post_json(router: Router, uri: &str, body: Value) -> Response {
    router
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}
