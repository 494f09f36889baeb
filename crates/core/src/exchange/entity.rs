use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// # Summary
/// 用于构造单个租户交易所客户端的密钥对。
///
/// # Invariants
/// - 只在单个请求的生命周期内持有，Debug 输出不泄露 `secret_key`。
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// 买卖方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            "" => Err("side 不能为空".to_string()),
            other => Err(format!("未知的买卖方向: {}", other)),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单类型。编排层只下达限价单。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
        }
    }
}

/// 订单有效期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    /// Good Till Cancelled
    Gtc,
    /// Immediate Or Cancel
    Ioc,
    /// Fill Or Kill
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
        }
    }
}

/// # Summary
/// 提交到交易所的下单意图。
#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl NewOrderRequest {
    /// 构造 GTC 限价单
    pub fn limit_gtc(symbol: impl Into<String>, side: OrderSide, price: Decimal, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity,
            price,
        }
    }
}

/// # Summary
/// 交易所侧的订单视图，只读透传给调用方。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeOrder {
    #[schema(example = "BTCUSDT")]
    pub symbol: String,
    #[schema(example = 28)]
    pub order_id: i64,
    #[schema(example = "6gCrw2kRUAF9CvJDGP16IP")]
    pub client_order_id: String,
    #[schema(example = "100.00")]
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    #[schema(example = "NEW")]
    pub status: String,
    #[schema(example = "GTC")]
    pub time_in_force: String,
    #[schema(example = "LIMIT")]
    pub order_type: String,
    #[schema(example = "BUY")]
    pub side: String,
    /// 下单时间 (毫秒)
    pub time: Option<i64>,
    /// 最后更新时间 (毫秒)
    pub update_time: Option<i64>,
}

/// 单个资产余额
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Balance {
    #[schema(example = "USDT")]
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// # Summary
/// 交易所账户快照。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountInfo {
    pub maker_commission: i64,
    pub taker_commission: i64,
    pub can_trade: bool,
    pub can_withdraw: bool,
    pub can_deposit: bool,
    pub update_time: i64,
    pub balances: Vec<Balance>,
}

/// 充值地址
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositAddress {
    #[schema(example = "BTC")]
    pub coin: String,
    pub address: String,
    pub tag: String,
    pub url: String,
}

/// 盘口单档
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// # Summary
/// 盘口深度快照。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderBook {
    pub symbol: String,
    pub last_update_id: i64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}
