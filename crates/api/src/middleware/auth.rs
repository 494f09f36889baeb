//! # 鉴权中间件
//!
//! 解析 `Authorization: Bearer <token>`，把调用者身份作为请求级的值注入扩展。

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use stratbot_manager::ManagerError;
use stratbot_manager::identity::Principal;

use crate::error::ApiError;
use crate::server::AppState;

/// 校验令牌并注入 `Principal`，失败直接以 401 信封返回
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let principal = state.identity.authenticate(header).map_err(|e| {
        tracing::warn!(path = %req.uri().path(), "authentication failed: {}", e);
        e
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// 在 Handler 中获取当前调用者
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentPrincipal)
            .ok_or(ApiError::Manager(ManagerError::Unauthenticated))
    }
}
