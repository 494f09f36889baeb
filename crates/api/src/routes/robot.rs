//! # 机器人路由控制器
//!
//! 每个用户至多一个机器人；除列表外的所有操作都做所有权校验。

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use stratbot_core::common::RobotId;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::CurrentPrincipal;
use crate::server::AppState;
use crate::types::{ApiResponse, Empty, OrderRecordResponse, RobotRequest, RobotResponse};

/// 查询自己的机器人，没有时 `data` 为 null
#[utoipa::path(
    get,
    path = "/api/v1/robots",
    tag = "机器人 (Robot)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<RobotResponse>),
        (status = 401, description = "未认证")
    )
)]
pub async fn my_robot(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
) -> Result<Json<ApiResponse<RobotResponse>>, ApiError> {
    let response = match state.robots.find_for_owner(me.user_id).await? {
        Some(robot) => ApiResponse::ok("Robot fetched", RobotResponse::from(&robot)),
        None => ApiResponse::empty("No robot configured"),
    };
    Ok(Json(response))
}

/// 创建机器人
#[utoipa::path(
    post,
    path = "/api/v1/robots",
    tag = "机器人 (Robot)",
    security(("bearer_jwt" = [])),
    request_body = RobotRequest,
    responses(
        (status = 201, description = "创建成功", body = ApiResponse<RobotResponse>),
        (status = 400, description = "交易对非法"),
        (status = 409, description = "已存在机器人"),
        (status = 401, description = "未认证")
    )
)]
pub async fn create_robot(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiJson(req): ApiJson<RobotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RobotResponse>>), ApiError> {
    let robot = state.robots.create(me.user_id, &req.symbol).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Robot created", RobotResponse::from(&robot))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/robots/{id}",
    tag = "机器人 (Robot)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "机器人 ID")),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<RobotResponse>),
        (status = 403, description = "不是自己的机器人"),
        (status = 404, description = "机器人不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_robot(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<RobotResponse>>, ApiError> {
    let robot = state.robots.get(me.user_id, RobotId(id)).await?;
    Ok(Json(ApiResponse::ok("Robot fetched", RobotResponse::from(&robot))))
}

/// 修改机器人的交易对
#[utoipa::path(
    put,
    path = "/api/v1/robots/{id}",
    tag = "机器人 (Robot)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "机器人 ID")),
    request_body = RobotRequest,
    responses(
        (status = 200, description = "修改成功", body = ApiResponse<RobotResponse>),
        (status = 400, description = "交易对非法"),
        (status = 403, description = "不是自己的机器人"),
        (status = 404, description = "机器人不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn update_robot(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RobotRequest>,
) -> Result<Json<ApiResponse<RobotResponse>>, ApiError> {
    let robot = state.robots.update(me.user_id, RobotId(id), &req.symbol).await?;
    Ok(Json(ApiResponse::ok("Robot updated", RobotResponse::from(&robot))))
}

/// 删除机器人，其本地订单记录一并删除
#[utoipa::path(
    delete,
    path = "/api/v1/robots/{id}",
    tag = "机器人 (Robot)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "机器人 ID")),
    responses(
        (status = 200, description = "删除成功", body = ApiResponse<Empty>),
        (status = 403, description = "不是自己的机器人"),
        (status = 404, description = "机器人不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn delete_robot(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.robots.delete(me.user_id, RobotId(id)).await?;
    Ok(Json(ApiResponse::ok("Robot deleted", Empty {})))
}

/// 机器人的本地下单记录，按时间倒序
#[utoipa::path(
    get,
    path = "/api/v1/robots/{id}/orders",
    tag = "机器人 (Robot)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "机器人 ID")),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<Vec<OrderRecordResponse>>),
        (status = 403, description = "不是自己的机器人"),
        (status = 404, description = "机器人不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn robot_orders(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Vec<OrderRecordResponse>>>, ApiError> {
    let orders = state.robots.local_orders(me.user_id, RobotId(id)).await?;
    let data = orders.iter().map(OrderRecordResponse::from).collect();
    Ok(Json(ApiResponse::ok("Robot orders fetched", data)))
}
