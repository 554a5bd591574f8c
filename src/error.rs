/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装: body は {"error": <message>, "status": <code>}
 * - RepoError / TokenError / PasswordError を統一的に変換 (backend の文言は外に出さない)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::repos::error::RepoError;
use crate::services::auth::jwt::TokenError;
use crate::services::password::PasswordError;

pub const INTERNAL_MESSAGE: &str = "Internal server";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AppError::NotFound("user"),
            RepoError::Conflict => AppError::bad_request("user already exists"),
            RepoError::Timeout | RepoError::Db(_) => {
                error!(error = ?e, "store operation failed");
                AppError::Internal
            }
        }
    }
}

// Parse failures surface to the client with the parser's reason.
impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing => AppError::Internal,
            other => AppError::unauthorized(other.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Mismatch => AppError::bad_request("bad user password"),
            PasswordError::HashingFailed | PasswordError::InvalidHash => {
                error!(error = %e, "password hash operation failed");
                AppError::Internal
            }
        }
    }
}
