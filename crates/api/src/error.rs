//! # API 统一错误处理
//!
//! 将 `ManagerError` 与请求解析失败统一映射到 HTTP 状态码与错误信封。

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stratbot_manager::ManagerError;
use thiserror::Error;

use crate::types::ApiErrorResponse;

/// API 层统一错误枚举
#[derive(Error, Debug)]
pub enum ApiError {
    /// 请求体 / 路径 / 查询参数无法解析 (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 业务层错误，按种类映射状态码
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

impl ApiError {
    /// # Summary
    /// 计算状态码、对外的简短描述与错误详情。
    ///
    /// # Invariants
    /// - `Internal` 的细节只进日志，详情固定为通用文案。
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg.clone()),
            ApiError::Manager(e) => match e {
                ManagerError::Unauthenticated | ManagerError::InvalidToken(_) => {
                    (StatusCode::UNAUTHORIZED, "Unauthorized", e.to_string())
                }
                ManagerError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden", e.to_string()),
                ManagerError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found", e.to_string()),
                ManagerError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", e.to_string()),
                ManagerError::NotBound => {
                    (StatusCode::PRECONDITION_FAILED, "Exchange credentials required", e.to_string())
                }
                ManagerError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "Validation failed", e.to_string())
                }
                ManagerError::Upstream(_) => {
                    (StatusCode::BAD_GATEWAY, "Exchange request failed", e.to_string())
                }
                ManagerError::Internal(msg) => {
                    tracing::error!("internal error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error",
                        "internal server error".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = self.parts();
        (status, Json(ApiErrorResponse::new(message, detail))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
