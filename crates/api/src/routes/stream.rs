use axum::Json;
use axum::extract::State;

use crate::error::ApiError;
use crate::middleware::auth::CurrentPrincipal;
use crate::server::AppState;
use crate::types::{ApiResponse, Empty, StreamResponse};

/// 开启用户数据流
///
/// 返回交易所分配的 listen key，并记录到绑定上 (覆盖旧值)。
#[utoipa::path(
    post,
    path = "/api/v1/binance/stream",
    tag = "数据流 (Stream)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "开启成功", body = ApiResponse<StreamResponse>),
        (status = 412, description = "尚未绑定凭证"),
        (status = 502, description = "交易所调用失败"),
        (status = 401, description = "未认证")
    )
)]
pub async fn start_stream(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
) -> Result<Json<ApiResponse<StreamResponse>>, ApiError> {
    let stream_key = state.bindings.start_stream(me.user_id).await?;
    Ok(Json(ApiResponse::ok("User data stream started", StreamResponse { stream_key })))
}

/// 用户数据流保活
#[utoipa::path(
    put,
    path = "/api/v1/binance/stream",
    tag = "数据流 (Stream)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "保活成功", body = ApiResponse<Empty>),
        (status = 412, description = "尚未绑定凭证或未开启数据流"),
        (status = 502, description = "交易所调用失败"),
        (status = 401, description = "未认证")
    )
)]
pub async fn keep_alive(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.bindings.keep_alive(me.user_id).await?;
    Ok(Json(ApiResponse::ok("User data stream kept alive", Empty {})))
}
