use crate::binding::CredentialBindingManager;
use crate::error::ManagerError;
use crate::robot::RobotRegistry;
use crate::upstream::call_upstream;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use stratbot_core::common::time::TimeProvider;
use stratbot_core::common::{RobotId, UserId};
use stratbot_core::exchange::entity::{
    AccountInfo, DepositAddress, ExchangeOrder, NewOrderRequest, OrderBook, OrderSide,
};
use stratbot_core::exchange::port::ExchangeClient;
use stratbot_core::store::port::{NewOrder, OrderRecord, OrderStore};
use tracing::{error, info};

/// 充值地址查询的默认币种
pub const DEFAULT_DEPOSIT_COIN: &str = "BTC";

/// 下单意图。方向、价格与数量保留原始文本，在所有权校验之后才解析
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub robot_id: RobotId,
    /// BUY / SELL，大小写不敏感
    pub side: Option<String>,
    /// 十进制文本，如 `"25000.5"`
    pub price: Option<String>,
    pub quantity: Option<String>,
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ManagerError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ManagerError::Validation(format!("{field} is required")))
}

fn positive_decimal(field: &str, value: Option<&str>) -> Result<Decimal, ManagerError> {
    let raw = required(field, value)?;
    let parsed = Decimal::from_str(raw)
        .map_err(|_| ManagerError::Validation(format!("{field} must be a decimal number, got {raw:?}")))?;
    if parsed <= Decimal::ZERO {
        return Err(ManagerError::Validation(format!("{field} must be positive")));
    }
    Ok(parsed)
}

/// 下单结果：本地记录与交易所回执
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub record: OrderRecord,
    pub exchange: ExchangeOrder,
}

/// # Summary
/// 订单编排器，交易类请求的顶层用例。
///
/// # Invariants
/// - 每次调用都重新执行前置链：绑定 (`NotBound`) → 机器人所有权 (`NotFound` / `Forbidden`)。
///   不在请求之间缓存任何所有权结论。
/// - 本地订单记录只在交易所受理后写入。
pub struct OrderOrchestrator {
    bindings: Arc<CredentialBindingManager>,
    robots: Arc<RobotRegistry>,
    orders: Arc<dyn OrderStore>,
    clock: Arc<dyn TimeProvider>,
}

impl OrderOrchestrator {
    pub fn new(
        bindings: Arc<CredentialBindingManager>,
        robots: Arc<RobotRegistry>,
        orders: Arc<dyn OrderStore>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            bindings,
            robots,
            orders,
            clock,
        }
    }

    fn deadline(&self) -> Duration {
        self.bindings.call_timeout()
    }

    /// 前置链：调用者的交易所客户端与其机器人的标的
    async fn resolve(
        &self,
        user_id: UserId,
        robot_id: RobotId,
    ) -> Result<(Arc<dyn ExchangeClient>, String), ManagerError> {
        let client = self.bindings.client_for(user_id).await?;
        let symbol = self.robots.resolve_symbol_for_owner(user_id, robot_id).await?;
        Ok((client, symbol))
    }

    /// # Summary
    /// 为调用者的机器人下一笔 GTC 限价单。
    ///
    /// # Logic
    /// 1. 解析绑定与机器人标的。
    /// 2. 解析并校验方向、价格、数量 (缺失或格式错误同样是 `Validation`)；不合法时不触达交易所。
    /// 3. 提交限价单。
    /// 4. 写入本地订单记录；写入失败时输出 `reconciliation` 日志并返回 `Internal`，
    ///    交易所侧的订单仍然存在。
    ///
    /// # Arguments
    /// * `user_id` - 调用者。
    /// * `req` - 下单意图。
    ///
    /// # Returns
    /// * `Result<PlacedOrder, ManagerError>` - 本地记录与交易所回执。
    pub async fn place(&self, user_id: UserId, req: PlaceOrder) -> Result<PlacedOrder, ManagerError> {
        let (client, symbol) = self.resolve(user_id, req.robot_id).await?;

        let side: OrderSide = required("side", req.side.as_deref())?
            .parse()
            .map_err(ManagerError::Validation)?;
        let price = positive_decimal("price", req.price.as_deref())?;
        let quantity = positive_decimal("quantity", req.quantity.as_deref())?;

        let ack = call_upstream(
            "create_order",
            self.deadline(),
            client.create_order(NewOrderRequest::limit_gtc(
                symbol.clone(),
                side,
                price,
                quantity,
            )),
        )
        .await?;
        info!(
            user = %user_id,
            robot = %req.robot_id,
            symbol = %symbol,
            exchange_order_id = ack.order_id,
            "order accepted by exchange"
        );

        let new_order = NewOrder {
            robot_id: req.robot_id,
            exchange_order_id: ack.order_id,
            client_order_id: ack.client_order_id.clone(),
            ordered_at: self.clock.now(),
        };
        match self.orders.insert_order(&new_order).await {
            Ok(record) => Ok(PlacedOrder {
                record,
                exchange: ack,
            }),
            Err(e) => {
                error!(
                    target: "reconciliation",
                    user = %user_id,
                    robot = %req.robot_id,
                    symbol = %symbol,
                    exchange_order_id = ack.order_id,
                    client_order_id = %ack.client_order_id,
                    error = %e,
                    "order accepted by exchange but not persisted"
                );
                Err(ManagerError::Internal(format!(
                    "order {} accepted by exchange but not persisted: {}",
                    ack.order_id, e
                )))
            }
        }
    }

    /// 查询单个订单；交易所报告未知订单时为 `NotFound`
    pub async fn get(
        &self,
        user_id: UserId,
        robot_id: RobotId,
        order_id: i64,
    ) -> Result<ExchangeOrder, ManagerError> {
        let (client, symbol) = self.resolve(user_id, robot_id).await?;
        call_upstream("get_order", self.deadline(), client.get_order(&symbol, order_id)).await
    }

    /// 撤单；交易所报告未知订单时为 `NotFound`
    pub async fn cancel(
        &self,
        user_id: UserId,
        robot_id: RobotId,
        order_id: i64,
    ) -> Result<ExchangeOrder, ManagerError> {
        let (client, symbol) = self.resolve(user_id, robot_id).await?;
        let canceled = call_upstream(
            "cancel_order",
            self.deadline(),
            client.cancel_order(&symbol, order_id),
        )
        .await?;
        info!(user = %user_id, robot = %robot_id, order_id, "order canceled");
        Ok(canceled)
    }

    pub async fn list_open(
        &self,
        user_id: UserId,
        robot_id: RobotId,
    ) -> Result<Vec<ExchangeOrder>, ManagerError> {
        let (client, symbol) = self.resolve(user_id, robot_id).await?;
        call_upstream("list_open_orders", self.deadline(), client.list_open_orders(&symbol)).await
    }

    pub async fn list_all(
        &self,
        user_id: UserId,
        robot_id: RobotId,
    ) -> Result<Vec<ExchangeOrder>, ManagerError> {
        let (client, symbol) = self.resolve(user_id, robot_id).await?;
        call_upstream("list_orders", self.deadline(), client.list_orders(&symbol)).await
    }

    pub async fn account(&self, user_id: UserId) -> Result<AccountInfo, ManagerError> {
        let client = self.bindings.client_for(user_id).await?;
        call_upstream("get_account", self.deadline(), client.get_account()).await
    }

    /// 充值地址，`coin` 为空时使用 BTC
    pub async fn deposit_address(
        &self,
        user_id: UserId,
        coin: Option<&str>,
    ) -> Result<DepositAddress, ManagerError> {
        let client = self.bindings.client_for(user_id).await?;
        let coin = coin
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_DEPOSIT_COIN)
            .to_ascii_uppercase();
        if !coin.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ManagerError::Validation("coin must be ASCII letters or digits".to_string()));
        }
        call_upstream(
            "get_deposit_address",
            self.deadline(),
            client.get_deposit_address(&coin),
        )
        .await
    }

    pub async fn depth(&self, user_id: UserId, symbol: &str) -> Result<OrderBook, ManagerError> {
        let client = self.bindings.client_for(user_id).await?;
        let symbol = crate::robot::normalize_symbol(symbol)?;
        call_upstream("get_depth", self.deadline(), client.get_depth(&symbol)).await
    }
}
