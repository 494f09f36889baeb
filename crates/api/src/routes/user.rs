use axum::Json;
use axum::extract::State;
use stratbot_manager::account::ProfileUpdate;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::auth::CurrentPrincipal;
use crate::server::AppState;
use crate::types::{ApiResponse, UpdateProfileRequest, UserResponse};

/// 获取当前用户资料
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "用户 (User)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<UserResponse>),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.accounts.profile(me.user_id).await?;
    Ok(Json(ApiResponse::ok("Profile fetched", UserResponse::from(&user))))
}

/// 修改当前用户资料
///
/// 仅更新请求中给出的字段；修改密码会重新哈希。
#[utoipa::path(
    put,
    path = "/api/v1/users/profile",
    tag = "用户 (User)",
    security(("bearer_jwt" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "修改成功", body = ApiResponse<UserResponse>),
        (status = 400, description = "参数校验失败"),
        (status = 409, description = "邮箱已被占用"),
        (status = 401, description = "未认证")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state
        .accounts
        .update_profile(
            me.user_id,
            ProfileUpdate {
                name: req.name,
                email: req.email,
                password: req.password,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok("Profile updated", UserResponse::from(&user))))
}
