/*
 * Responsibility
 * - HTTP 境界のエラー (AppError) 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - DispatchError を統一的に変換 (設定ミスは error ログ)
 *
 * NotFound は AppError ではない: Dispatcher が error route で 404 Response を返す。
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::dispatch::DispatchError;
use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("service unavailable: {0}")]
    Unavailable(&'static str),
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unavailable(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                format!("{what} unavailable"),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        if e.is_configuration() {
            error!(error = %e, "route configuration error");
            return AppError::Internal;
        }
        match e {
            DispatchError::Auth(AuthError::Session(e)) => {
                error!(error = %e, "session store failure");
                AppError::Unavailable("session store")
            }
            e => {
                error!(error = %e, "dispatch failed");
                AppError::Internal
            }
        }
    }
}
