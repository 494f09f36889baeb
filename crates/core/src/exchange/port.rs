use super::entity::{
    AccountInfo, ApiCredentials, DepositAddress, ExchangeOrder, NewOrderRequest, OrderBook,
};
use super::error::ExchangeError;
use async_trait::async_trait;
use std::sync::Arc;

/// # Summary
/// 单个租户视角下的交易所能力集合。
/// 编排层只通过此端口与交易所交互，所有方法都在构造时绑定的凭证下执行。
///
/// # Invariants
/// - 实例只服务于一组凭证，不得跨用户复用。
/// - 内部不做重试，失败原样以 `ExchangeError` 返回。
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// 开启用户数据流，返回 listenKey
    async fn start_user_stream(&self) -> Result<String, ExchangeError>;

    /// 为指定 listenKey 续期
    async fn keep_alive_user_stream(&self, stream_key: &str) -> Result<(), ExchangeError>;

    /// # Summary
    /// 提交新订单。
    ///
    /// # Returns
    /// * `Ok(ExchangeOrder)` - 交易所受理后的订单，包含交易所订单号与客户端订单号
    /// * `Err(ExchangeError)` - 参数被拒绝或传输失败
    async fn create_order(&self, request: NewOrderRequest) -> Result<ExchangeOrder, ExchangeError>;

    /// 查询单个订单；未知订单返回 `OrderNotFound`
    async fn get_order(&self, symbol: &str, order_id: i64) -> Result<ExchangeOrder, ExchangeError>;

    /// 撤销订单；未知订单返回 `OrderNotFound`
    async fn cancel_order(&self, symbol: &str, order_id: i64)
    -> Result<ExchangeOrder, ExchangeError>;

    async fn list_open_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrder>, ExchangeError>;

    async fn list_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrder>, ExchangeError>;

    async fn get_account(&self) -> Result<AccountInfo, ExchangeError>;

    async fn get_deposit_address(&self, coin: &str) -> Result<DepositAddress, ExchangeError>;

    /// 盘口深度快照
    async fn get_depth(&self, symbol: &str) -> Result<OrderBook, ExchangeError>;
}

/// # Summary
/// 交易所客户端工厂。每个请求以解析出的凭证调用一次 `connect`。
///
/// # Invariants
/// - 返回的客户端只持有传入的凭证；连接池等无状态资源可以共享。
pub trait ExchangeConnector: Send + Sync {
    fn connect(&self, credentials: ApiCredentials) -> Arc<dyn ExchangeClient>;
}
