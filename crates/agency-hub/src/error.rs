use crate::agencies::AgencyServiceError;
use crate::config::ConfigError;
use crate::feeds::{AggregateError, FeedError};
use crate::jobs::JobBusy;
use crate::store::RepositoryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};
use std::fmt;

/// Process-level failure returned from the binary's entry points.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Database(RepositoryError),
    Feed(AggregateError),
    Agencies(AgencyServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Database(err) => write!(f, "database error: {}", err),
            AppError::Feed(err) => write!(f, "feed error: {}", err),
            AppError::Agencies(err) => write!(f, "agency job failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Database(err) => Some(err),
            AppError::Feed(err) => Some(err),
            AppError::Agencies(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Database(value)
    }
}

impl From<AggregateError> for AppError {
    fn from(value: AggregateError) -> Self {
        Self::Feed(value)
    }
}

impl From<AgencyServiceError> for AppError {
    fn from(value: AgencyServiceError) -> Self {
        Self::Agencies(value)
    }
}

/// HTTP-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    Forbidden,
    /// A batch job is already running.
    Conflict,
    Upstream,
    Unconfigured,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Upstream | ErrorKind::Unconfigured | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response rendered as `{message, error?, ...details}`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    error: Option<String>,
    details: Map<String, Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            error: None,
            details: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn unconfigured(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unconfigured, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// A third-party call failed; the vendor's status and body ride along.
    pub fn upstream(message: impl Into<String>, source: &FeedError) -> Self {
        let kind = match source {
            FeedError::Unconfigured(_) => ErrorKind::Unconfigured,
            _ => ErrorKind::Upstream,
        };
        let mut error = Self::new(kind, message).with_error(source);
        if let Some(status) = source.status() {
            error = error.with_detail("status", status);
        }
        if let Some(body) = source.body() {
            error = error.with_detail("response", body);
        }
        error
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    fn body(self) -> Value {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(self.message));
        if let Some(error) = self.error {
            body.insert("error".to_string(), Value::String(error));
        }
        for (key, value) in self.details {
            body.entry(key).or_insert(value);
        }
        Value::Object(body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<JobBusy> for ApiError {
    fn from(value: JobBusy) -> Self {
        Self::new(ErrorKind::Conflict, value.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::not_found("Record not found"),
            RepositoryError::Conflict(detail) => Self::validation(detail),
            other => Self::internal("Database error").with_error(other),
        }
    }
}
