//! Unified application error model and its HTTP mapping.
//! Every handler failure funnels through `AppError`, which always renders the same
//! JSON body: `{"status":"error","code":..,"message":..}` plus `fields` for
//! validation failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt::{Display, Formatter};
use tracing::{error, warn};

use crate::model::FieldError;
use crate::storage::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    UserInput { code: String, message: String },
    Validation { code: String, message: String, fields: Vec<FieldError> },
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Unavailable { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Unavailable { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Unavailable { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn unavailable<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unavailable { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        AppError::Validation { code: "validation_failed".into(), message: "Invalid input".into(), fields }
    }

    /// The single opaque rejection used for every authentication failure.
    pub fn unauthorized() -> Self {
        AppError::Auth { code: "unauthorized".into(), message: "Unauthorized".into() }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Validation { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Auth { .. } => 401,
            AppError::Unavailable { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        });
        if let AppError::Validation { fields, .. } = self {
            body["fields"] = serde_json::to_value(fields).unwrap_or_default();
        }
        body
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        warn!(target: "storage", error = %err, "store call failed");
        match err {
            StoreError::Unavailable(_) => AppError::unavailable("store_unavailable", "Document store unavailable"),
            StoreError::Encoding(_) | StoreError::Entropy(_) => AppError::internal("store_error", "Document store error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.code_str(), message = self.message(), "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
