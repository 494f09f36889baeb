//! # 身份验证路由控制器
//!
//! 注册与登录，均为公开接口。

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use stratbot_manager::account::Registration;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::server::AppState;
use crate::types::{ApiResponse, LoginRequest, LoginResponse, RegisterRequest, UserResponse};

/// 用户注册
///
/// 邮箱忽略大小写且全局唯一。
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "鉴权 (Auth)",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "注册成功", body = ApiResponse<UserResponse>),
        (status = 400, description = "参数校验失败"),
        (status = 409, description = "邮箱已被注册")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User registered", UserResponse::from(&user))),
    ))
}

/// 用户登录
///
/// 验证邮箱和密码，颁发 JWT Token。
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "鉴权 (Auth)",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "登录成功", body = ApiResponse<LoginResponse>),
        (status = 401, description = "邮箱或密码错误")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let (user, token) = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(ApiResponse::ok("Login successful", LoginResponse::new(&user, token))))
}
