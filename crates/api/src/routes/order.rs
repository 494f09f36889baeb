//! # 交易路由控制器
//!
//! 下单、查单、撤单与账户类只读查询。交易标的永远取自调用方自己的机器人，
//! 交易所客户端按请求用调用方的凭证临时构建。

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use stratbot_core::common::RobotId;
use stratbot_core::exchange::entity::{AccountInfo, DepositAddress, ExchangeOrder, OrderBook};
use stratbot_manager::order::PlaceOrder;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::CurrentPrincipal;
use crate::server::AppState;
use crate::types::{
    ApiResponse, CoinQuery, DepthQuery, PlaceOrderRequest, PlacedOrderResponse, RobotQuery,
};

/// 限价下单
///
/// # Logic
/// 1. 校验绑定与机器人所有权，取机器人的交易标的。
/// 2. 解析并校验方向、价格与数量 (缺失或格式错误为 400)。
/// 3. 以 LIMIT/GTC 提交到交易所，成功后记录本地订单。
#[utoipa::path(
    post,
    path = "/api/v1/binance/orders",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "下单成功", body = ApiResponse<PlacedOrderResponse>),
        (status = 400, description = "参数校验失败"),
        (status = 403, description = "不是自己的机器人"),
        (status = 404, description = "机器人不存在"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 502, description = "交易所拒单或不可达"),
        (status = 401, description = "未认证")
    )
)]
pub async fn place_order(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrderResponse>>), ApiError> {
    let placed = state.orders.place(me.user_id, PlaceOrder::from(req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Order placed", PlacedOrderResponse::from(placed))),
    ))
}

/// 查询机器人标的上的全部订单
#[utoipa::path(
    get,
    path = "/api/v1/binance/orders",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    params(RobotQuery),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<Vec<ExchangeOrder>>),
        (status = 403, description = "不是自己的机器人"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiQuery(query): ApiQuery<RobotQuery>,
) -> Result<Json<ApiResponse<Vec<ExchangeOrder>>>, ApiError> {
    let orders = state.orders.list_all(me.user_id, RobotId(query.robot)).await?;
    Ok(Json(ApiResponse::ok("Orders fetched", orders)))
}

/// 按交易所订单号查询
#[utoipa::path(
    get,
    path = "/api/v1/binance/orders/{id}",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "交易所订单号"), RobotQuery),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<ExchangeOrder>),
        (status = 404, description = "订单或机器人不存在"),
        (status = 403, description = "不是自己的机器人"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RobotQuery>,
) -> Result<Json<ApiResponse<ExchangeOrder>>, ApiError> {
    let order = state.orders.get(me.user_id, RobotId(query.robot), id).await?;
    Ok(Json(ApiResponse::ok("Order fetched", order)))
}

/// 撤单
#[utoipa::path(
    delete,
    path = "/api/v1/binance/orders/{id}",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "交易所订单号"), RobotQuery),
    responses(
        (status = 200, description = "撤单成功", body = ApiResponse<ExchangeOrder>),
        (status = 404, description = "订单或机器人不存在"),
        (status = 403, description = "不是自己的机器人"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RobotQuery>,
) -> Result<Json<ApiResponse<ExchangeOrder>>, ApiError> {
    let order = state.orders.cancel(me.user_id, RobotId(query.robot), id).await?;
    Ok(Json(ApiResponse::ok("Order canceled", order)))
}

/// 当前挂单
#[utoipa::path(
    get,
    path = "/api/v1/binance/openOrders",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    params(RobotQuery),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<Vec<ExchangeOrder>>),
        (status = 403, description = "不是自己的机器人"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn open_orders(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiQuery(query): ApiQuery<RobotQuery>,
) -> Result<Json<ApiResponse<Vec<ExchangeOrder>>>, ApiError> {
    let orders = state.orders.list_open(me.user_id, RobotId(query.robot)).await?;
    Ok(Json(ApiResponse::ok("Open orders fetched", orders)))
}

/// 交易所账户快照
#[utoipa::path(
    get,
    path = "/api/v1/binance/account",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<AccountInfo>),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn account(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
) -> Result<Json<ApiResponse<AccountInfo>>, ApiError> {
    let info = state.orders.account(me.user_id).await?;
    Ok(Json(ApiResponse::ok("Account fetched", info)))
}

/// 充值地址
#[utoipa::path(
    get,
    path = "/api/v1/binance/getCoin",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    params(CoinQuery),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<DepositAddress>),
        (status = 400, description = "币种非法"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn deposit_address(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiQuery(query): ApiQuery<CoinQuery>,
) -> Result<Json<ApiResponse<DepositAddress>>, ApiError> {
    let address = state
        .orders
        .deposit_address(me.user_id, query.coin.as_deref())
        .await?;
    Ok(Json(ApiResponse::ok("Deposit address fetched", address)))
}

/// 盘口深度
#[utoipa::path(
    get,
    path = "/api/v1/binance/depth",
    tag = "交易 (Order)",
    security(("bearer_jwt" = [])),
    params(DepthQuery),
    responses(
        (status = 200, description = "查询成功", body = ApiResponse<OrderBook>),
        (status = 400, description = "交易对非法"),
        (status = 412, description = "尚未绑定凭证"),
        (status = 401, description = "未认证")
    )
)]
pub async fn depth(
    State(state): State<AppState>,
    CurrentPrincipal(me): CurrentPrincipal,
    ApiQuery(query): ApiQuery<DepthQuery>,
) -> Result<Json<ApiResponse<OrderBook>>, ApiError> {
    let book = state.orders.depth(me.user_id, &query.symbol).await?;
    Ok(Json(ApiResponse::ok("Depth fetched", book)))
}
