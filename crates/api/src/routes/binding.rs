//! # 交易所凭证绑定路由
//!
//! 每个用户至多一条绑定；更新与解绑都做所有权校验。

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use stratbot_core::common::BindingId;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::CurrentPrincipal;
use crate::server::AppState;
use crate::types::{ApiResponse, BindRequest, BindingResponse, Empty};

/// 查询自己的凭证绑定
///
/// 返回列表 (0 或 1 条)，`api_key` 打码且不含密钥。
#[utoipa::path(
    get,
    path = "/api/v1/binance/get-bind",
    tag = "凭证 (Binding)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<Vec<BindingResponse>>),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_bind(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
) -> Result<Json<ApiResponse<Vec<BindingResponse>>>, ApiError> {
    let bindings = state.bindings.list_for_owner(me.user_id).await?;
    let data = bindings.iter().map(BindingResponse::from).collect();
    Ok(Json(ApiResponse::ok("Bindings fetched", data)))
}

/// 绑定交易所 API Key
#[utoipa::path(
    post,
    path = "/api/v1/binance/bind",
    tag = "凭证 (Binding)",
    security(("bearer_jwt" = [])),
    request_body = BindRequest,
    responses(
        (status = 201, description = "绑定成功", body = ApiResponse<BindingResponse>),
        (status = 400, description = "密钥为空"),
        (status = 409, description = "已存在绑定"),
        (status = 401, description = "未认证")
    )
)]
pub async fn bind(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiJson(req): ApiJson<BindRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BindingResponse>>), ApiError> {
    let binding = state
        .bindings
        .bind(me.user_id, &req.api_key, &req.secret_key)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Credentials bound", BindingResponse::from(&binding))),
    ))
}

/// 替换绑定的密钥对
///
/// 替换后旧的用户数据流失效，需要重新开启。
#[utoipa::path(
    put,
    path = "/api/v1/binance/update-bind/{id}",
    tag = "凭证 (Binding)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "绑定 ID")),
    request_body = BindRequest,
    responses(
        (status = 200, description = "更新成功", body = ApiResponse<BindingResponse>),
        (status = 403, description = "不是自己的绑定"),
        (status = 404, description = "绑定不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn update_bind(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<BindRequest>,
) -> Result<Json<ApiResponse<BindingResponse>>, ApiError> {
    let binding = state
        .bindings
        .update(me.user_id, BindingId(id), &req.api_key, &req.secret_key)
        .await?;
    Ok(Json(ApiResponse::ok("Credentials updated", BindingResponse::from(&binding))))
}

/// 解除绑定
#[utoipa::path(
    delete,
    path = "/api/v1/binance/unbind/{id}",
    tag = "凭证 (Binding)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "绑定 ID")),
    responses(
        (status = 200, description = "解绑成功", body = ApiResponse<Empty>),
        (status = 403, description = "不是自己的绑定"),
        (status = 404, description = "绑定不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn unbind(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.bindings.unbind(me.user_id, BindingId(id)).await?;
    Ok(Json(ApiResponse::ok("Credentials unbound", Empty {})))
}
