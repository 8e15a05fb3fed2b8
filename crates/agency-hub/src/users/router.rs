use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::domain::{LoginRequest, SignupRequest, VerifyTokenRequest};
use super::repository::UserRepository;
use super::service::{AuthError, AuthService, TokenVerifier};
use crate::error::ApiError;

/// Router for account creation and session tokens.
pub fn user_router<U>(service: Arc<AuthService<U>>) -> Router
where
    U: UserRepository + 'static,
{
    Router::new()
        .route("/signup", post(signup_handler::<U>))
        .route("/login", post(login_handler::<U>))
        .route("/verify_token", post(verify_token_handler::<U>))
        .with_state(service)
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingFields(_) | AuthError::EmailTaken => {
                ApiError::validation(value.to_string())
            }
            AuthError::InvalidCredentials | AuthError::Expired | AuthError::InvalidToken => {
                ApiError::unauthorized(value.to_string())
            }
            AuthError::Superseded => ApiError::unauthorized("Invalid token"),
            AuthError::Unconfigured => ApiError::unconfigured(value.to_string()),
            AuthError::Repository(error) => error.into(),
            AuthError::Hashing(_) | AuthError::Signing(_) => {
                ApiError::internal("Authentication failed").with_error(value)
            }
        }
    }
}

pub(crate) async fn signup_handler<U>(
    State(service): State<Arc<AuthService<U>>>,
    Json(request): Json<SignupRequest>,
) -> Result<Response, ApiError>
where
    U: UserRepository + 'static,
{
    service.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    )
        .into_response())
}

pub(crate) async fn login_handler<U>(
    State(service): State<Arc<AuthService<U>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    U: UserRepository + 'static,
{
    let token = service.login(request).await?;
    Ok(Json(json!({ "token": token })))
}

pub(crate) async fn verify_token_handler<U>(
    State(service): State<Arc<AuthService<U>>>,
    Json(request): Json<VerifyTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    U: UserRepository + 'static,
{
    let token = request
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::validation("Token is missing"))?;
    service.verify(&token).await?;
    Ok(Json(json!({ "message": "Token is valid" })))
}

/// Route layer for protected endpoints. Reads the `token` header and stores the
/// caller as an [`AuthenticatedUser`](super::AuthenticatedUser) request extension.
pub async fn require_token(
    State(verifier): State<Arc<dyn TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = request
        .headers()
        .get("token")
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
    else {
        return ApiError::unauthorized("Access denied. No token provided.").into_response();
    };

    match verifier.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(AuthError::Unconfigured) => ApiError::from(AuthError::Unconfigured).into_response(),
        Err(AuthError::Repository(error)) => ApiError::from(error).into_response(),
        Err(error) => {
            tracing::debug!(%error, "token rejected");
            ApiError::forbidden(error.to_string()).into_response()
        }
    }
}
