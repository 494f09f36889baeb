//! 请求提取器包装：解析失败统一走 `ApiError::BadRequest`，返回标准错误信封。

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON 请求体
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// 路径参数
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// 查询参数
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
