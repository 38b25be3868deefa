use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::image::ImageError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Caller's fault: missing or malformed input.
    #[error("{0}")]
    BadRequest(String),
    /// Operator's fault: no usable provider credential.
    #[error("{0}")]
    Config(String),
    /// Every configured provider failed.
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: String,
    },
    /// Body could not be read, e.g. it exceeds the size limit.
    #[error("{message}")]
    Body { status: StatusCode, message: String },
    #[error("Method not allowed")]
    MethodNotAllowed,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transactions: Option<Vec<serde_json::Value>>,
}

impl ErrorBody {
    fn plain(error: String) -> Self {
        Self {
            error,
            details: None,
            success: None,
            transactions: None,
        }
    }

    /// Failure shape clients can treat like an empty extraction.
    fn failed(error: String, details: Option<String>) -> Self {
        Self {
            error,
            details,
            success: Some(false),
            transactions: Some(Vec::new()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Body { status, .. } => *status,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) | ApiError::Body { message: msg, .. } => {
                ErrorBody::plain(msg)
            }
            ApiError::MethodNotAllowed => ErrorBody::plain("Method not allowed".to_string()),
            ApiError::Upstream {
                message, details, ..
            } => ErrorBody::failed(message, Some(details)),
            ApiError::Config(msg) => ErrorBody::failed(msg, None),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Body for a handler that panicked.
pub fn panic_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::failed(message.to_string(), None)),
    )
        .into_response()
}
