//! # API 数据传输对象 (DTO)
//!
//! 请求体与响应体定义。领域实体到 DTO 的映射全部是显式的 `From` 实现，
//! 不存在可能失败的隐式映射。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use stratbot_core::common::RobotId;
use stratbot_core::exchange::entity::ExchangeOrder;
use stratbot_core::store::port::{CredentialBinding, OrderRecord, Robot, User};
use stratbot_manager::identity::IssuedToken;
use stratbot_manager::order::{PlaceOrder, PlacedOrder};

// ============================================================
//  通用响应信封
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 人类可读的结果描述
    pub message: String,
    /// 错误详情 (成功时为 null)
    pub errors: Option<Vec<String>>,
    /// 数据载荷
    pub data: Option<T>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
            data: Some(data),
        }
    }

    /// 成功但没有数据 (`data: null`)
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
            data: None,
        }
    }
}

/// 空对象，序列化为 `{}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Empty {}

/// 失败响应，`data` 固定为 `{}`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
    pub data: Empty,
}

impl ApiErrorResponse {
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: vec![detail.into()],
            data: Empty {},
        }
    }
}

// ============================================================
//  鉴权 / 用户 DTO
// ============================================================

/// 注册请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Alice")]
    pub name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "correct-horse")]
    pub password: String,
}

/// 登录请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
}

/// 用户资料 (不含密码哈希)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.0,
            name: u.name.clone(),
            email: u.email.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// 登录成功返回的令牌
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// JWT 令牌，放入 `Authorization: Bearer <token>`
    pub token: String,
    /// 有效期 (秒)
    pub expires_in: u64,
    pub user: UserResponse,
}

impl LoginResponse {
    pub fn new(user: &User, token: IssuedToken) -> Self {
        Self {
            token: token.token,
            expires_in: token.expires_in,
            user: UserResponse::from(user),
        }
    }
}

/// 资料修改请求体，缺省字段保持不变
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

// ============================================================
//  交易所凭证 DTO
// ============================================================

/// 绑定 / 更新凭证请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BindRequest {
    pub api_key: String,
    pub secret_key: String,
}

/// 凭证绑定视图。永不返回 `secret_key`，`api_key` 打码
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BindingResponse {
    pub id: i64,
    pub user_id: i64,
    #[schema(example = "vmPU****A1b2")]
    pub api_key: String,
    pub stream_key: Option<String>,
    pub bound_at: DateTime<Utc>,
    pub streamed_at: Option<DateTime<Utc>>,
}

/// 保留首尾各 4 位，过短的 key 整体打码
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars.iter().take(4).collect();
    let tail: String = chars.iter().skip(chars.len() - 4).collect();
    format!("{head}****{tail}")
}

impl From<&CredentialBinding> for BindingResponse {
    fn from(b: &CredentialBinding) -> Self {
        Self {
            id: b.id.0,
            user_id: b.owner.0,
            api_key: mask_key(&b.api_key),
            stream_key: b.stream_key.clone(),
            bound_at: b.bound_at,
            streamed_at: b.streamed_at,
        }
    }
}

/// 用户数据流开启结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreamResponse {
    #[schema(example = "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1")]
    pub stream_key: String,
}

// ============================================================
//  机器人 DTO
// ============================================================

/// 创建 / 修改机器人请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RobotRequest {
    #[schema(example = "BTCUSDT")]
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RobotResponse {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Robot> for RobotResponse {
    fn from(r: &Robot) -> Self {
        Self {
            id: r.id.0,
            user_id: r.owner.0,
            symbol: r.symbol.clone(),
            created_at: r.created_at,
        }
    }
}

// ============================================================
//  订单 DTO
// ============================================================

/// 下单请求体 (限价 GTC)
///
/// 方向、价格、数量按原样收下，由下单流程在凭证与所有权校验之后解析，
/// 因此缺失或格式错误的字段不会掩盖 412 / 403 / 404。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub robot_id: i64,
    #[schema(value_type = Option<String>, example = "BUY")]
    pub side: Option<Value>,
    /// 十进制字符串或数字
    #[schema(value_type = Option<String>, example = "25000.50")]
    pub price: Option<Value>,
    #[schema(value_type = Option<String>, example = "0.01")]
    pub quantity: Option<Value>,
}

/// JSON 标量转为原始文本；非标量保留其 JSON 文本，交由下单校验拒绝
fn raw_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl From<PlaceOrderRequest> for PlaceOrder {
    fn from(req: PlaceOrderRequest) -> Self {
        Self {
            robot_id: RobotId(req.robot_id),
            side: raw_text(req.side),
            price: raw_text(req.price),
            quantity: raw_text(req.quantity),
        }
    }
}

/// 本地订单记录
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderRecordResponse {
    pub id: i64,
    pub robot_id: i64,
    pub exchange_order_id: i64,
    pub client_order_id: String,
    pub ordered_at: DateTime<Utc>,
}

impl From<&OrderRecord> for OrderRecordResponse {
    fn from(o: &OrderRecord) -> Self {
        Self {
            id: o.id,
            robot_id: o.robot_id.0,
            exchange_order_id: o.exchange_order_id,
            client_order_id: o.client_order_id.clone(),
            ordered_at: o.ordered_at,
        }
    }
}

/// 下单结果：本地记录与交易所回执
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlacedOrderResponse {
    pub order: OrderRecordResponse,
    pub exchange: ExchangeOrder,
}

impl From<PlacedOrder> for PlacedOrderResponse {
    fn from(p: PlacedOrder) -> Self {
        Self {
            order: OrderRecordResponse::from(&p.record),
            exchange: p.exchange,
        }
    }
}

// ============================================================
//  查询参数
// ============================================================

/// 以机器人定位交易标的
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RobotQuery {
    /// 调用方拥有的机器人 ID
    pub robot: i64,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CoinQuery {
    /// 币种，缺省为 BTC
    pub coin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DepthQuery {
    #[param(example = "BTCUSDT")]
    pub symbol: String,
}
