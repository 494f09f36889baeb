//! # 测试替身
//!
//! 供下游 crate 的测试使用的内存仓储与可录制的模拟交易所。
//! 仅在开启 `test-utils` feature 时编译。

use crate::common::{BindingId, RobotId, UserId};
use crate::exchange::entity::{
    AccountInfo, ApiCredentials, Balance, DepositAddress, ExchangeOrder, NewOrderRequest,
    OrderBook, OrderSide, PriceLevel,
};
use crate::exchange::error::ExchangeError;
use crate::exchange::port::{ExchangeClient, ExchangeConnector};
use crate::store::error::StoreError;
use crate::store::port::{
    CredentialBinding, CredentialStore, NewBinding, NewOrder, NewRobot, NewUser, OrderRecord,
    OrderStore, Robot, RobotStore, User, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================
//  内存仓储
// ============================================================

#[derive(Default)]
struct MemoryTables {
    next_id: i64,
    users: HashMap<i64, User>,
    bindings: HashMap<i64, CredentialBinding>,
    robots: HashMap<i64, Robot>,
    orders: Vec<OrderRecord>,
}

impl MemoryTables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// # Summary
/// 实现全部存储端口的内存仓储。
///
/// # Invariants
/// - 与 SQLite 实现保持相同的唯一约束：邮箱、每用户一条绑定、每用户一个机器人。
/// - 删除机器人时级联删除其本地订单。
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
    fail_order_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让后续的订单写入失败，用于模拟 "交易所已受理但本地落库失败"
    pub fn set_fail_order_inserts(&self, fail: bool) {
        self.fail_order_inserts.store(fail, Ordering::SeqCst);
    }

    /// 直接插入一个用户，跳过注册流程
    pub async fn seed_user(&self, name: &str, email: &str) -> User {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let now = Utc::now();
        let user = User {
            id: UserId(id),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        user
    }

    pub async fn binding_count_for(&self, user_id: UserId) -> usize {
        let tables = self.tables.read().await;
        tables.bindings.values().filter(|b| b.owner == user_id).count()
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        let id = tables.allocate_id();
        let created = User {
            id: UserId(id),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id.0).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        let slot = tables.users.get_mut(&user.id.0).ok_or(StoreError::NotFound)?;
        *slot = user.clone();
        Ok(user.clone())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_binding(&self, binding: &NewBinding) -> Result<CredentialBinding, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.bindings.values().any(|b| b.owner == binding.owner) {
            return Err(StoreError::Conflict(format!(
                "user {} already has a binding",
                binding.owner
            )));
        }
        let id = tables.allocate_id();
        let created = CredentialBinding {
            id: BindingId(id),
            owner: binding.owner,
            api_key: binding.api_key.clone(),
            secret_key: binding.secret_key.clone(),
            stream_key: None,
            bound_at: binding.bound_at,
            streamed_at: None,
        };
        tables.bindings.insert(id, created.clone());
        Ok(created)
    }

    async fn get_binding(&self, id: BindingId) -> Result<Option<CredentialBinding>, StoreError> {
        Ok(self.tables.read().await.bindings.get(&id.0).cloned())
    }

    async fn find_binding_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<CredentialBinding>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.bindings.values().find(|b| b.owner == user_id).cloned())
    }

    async fn update_binding_keys(
        &self,
        id: BindingId,
        api_key: &str,
        secret_key: &str,
    ) -> Result<CredentialBinding, StoreError> {
        let mut tables = self.tables.write().await;
        let binding = tables.bindings.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        binding.api_key = api_key.to_string();
        binding.secret_key = secret_key.to_string();
        binding.stream_key = None;
        binding.streamed_at = None;
        Ok(binding.clone())
    }

    async fn set_stream_key(
        &self,
        id: BindingId,
        stream_key: &str,
        streamed_at: DateTime<Utc>,
    ) -> Result<CredentialBinding, StoreError> {
        let mut tables = self.tables.write().await;
        let binding = tables.bindings.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        binding.stream_key = Some(stream_key.to_string());
        binding.streamed_at = Some(streamed_at);
        Ok(binding.clone())
    }

    async fn delete_binding(&self, id: BindingId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .bindings
            .remove(&id.0)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl RobotStore for MemoryStore {
    async fn insert_robot(&self, robot: &NewRobot) -> Result<Robot, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.robots.values().any(|r| r.owner == robot.owner) {
            return Err(StoreError::Conflict(format!(
                "user {} already has a robot",
                robot.owner
            )));
        }
        let id = tables.allocate_id();
        let created = Robot {
            id: RobotId(id),
            owner: robot.owner,
            symbol: robot.symbol.clone(),
            created_at: robot.created_at,
        };
        tables.robots.insert(id, created.clone());
        Ok(created)
    }

    async fn get_robot(&self, id: RobotId) -> Result<Option<Robot>, StoreError> {
        Ok(self.tables.read().await.robots.get(&id.0).cloned())
    }

    async fn find_robot_by_user(&self, user_id: UserId) -> Result<Option<Robot>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.robots.values().find(|r| r.owner == user_id).cloned())
    }

    async fn update_robot_symbol(&self, id: RobotId, symbol: &str) -> Result<Robot, StoreError> {
        let mut tables = self.tables.write().await;
        let robot = tables.robots.get_mut(&id.0).ok_or(StoreError::NotFound)?;
        robot.symbol = symbol.to_string();
        Ok(robot.clone())
    }

    async fn delete_robot(&self, id: RobotId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.robots.remove(&id.0).ok_or(StoreError::NotFound)?;
        tables.orders.retain(|o| o.robot_id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, StoreError> {
        if self.fail_order_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database("simulated write failure".to_string()));
        }
        let mut tables = self.tables.write().await;
        if !tables.robots.contains_key(&order.robot_id.0) {
            return Err(StoreError::Database(format!(
                "robot {} does not exist",
                order.robot_id
            )));
        }
        let id = tables.allocate_id();
        let record = OrderRecord {
            id,
            robot_id: order.robot_id,
            exchange_order_id: order.exchange_order_id,
            client_order_id: order.client_order_id.clone(),
            ordered_at: order.ordered_at,
        };
        tables.orders.push(record.clone());
        Ok(record)
    }

    async fn list_orders_by_robot(&self, robot_id: RobotId) -> Result<Vec<OrderRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderRecord> = tables
            .orders
            .iter()
            .filter(|o| o.robot_id == robot_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }
}

// ============================================================
//  模拟交易所
// ============================================================

/// 模拟交易所收到的一次调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    StartUserStream,
    KeepAlive(String),
    CreateOrder {
        symbol: String,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    },
    GetOrder { symbol: String, order_id: i64 },
    CancelOrder { symbol: String, order_id: i64 },
    ListOpenOrders(String),
    ListOrders(String),
    Account,
    DepositAddress(String),
    Depth(String),
}

struct MockExchangeState {
    // (api_key, 调用)
    calls: Mutex<Vec<(String, MockCall)>>,
    orders: Mutex<HashMap<i64, ExchangeOrder>>,
    next_order_id: AtomicI64,
    stream_key: Mutex<String>,
    next_failure: Mutex<Option<ExchangeError>>,
    delay: Mutex<Option<Duration>>,
}

/// # Summary
/// 可录制调用、可注入失败的模拟交易所，同时充当 `ExchangeConnector`。
///
/// # Invariants
/// - 每次 `connect` 都返回绑定了该次凭证的新客户端，调用记录按 `api_key` 区分。
/// - 注入的失败只生效一次。
#[derive(Clone)]
pub struct MockExchange {
    state: Arc<MockExchangeState>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockExchangeState {
                calls: Mutex::new(Vec::new()),
                orders: Mutex::new(HashMap::new()),
                next_order_id: AtomicI64::new(1000),
                stream_key: Mutex::new("mock-listen-key".to_string()),
                next_failure: Mutex::new(None),
                delay: Mutex::new(None),
            }),
        }
    }

    /// 指定 `start_user_stream` 返回的 listenKey
    pub fn set_stream_key(&self, key: &str) {
        *lock(&self.state.stream_key) = key.to_string();
    }

    /// 下一次调用返回给定错误
    pub fn fail_next(&self, err: ExchangeError) {
        *lock(&self.state.next_failure) = Some(err);
    }

    /// 每次调用前休眠，用于验证截止时间
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.state.delay) = Some(delay);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.state.calls).iter().map(|(_, c)| c.clone()).collect()
    }

    /// 以指定 api_key 发起的调用
    pub fn calls_for(&self, api_key: &str) -> Vec<MockCall> {
        lock(&self.state.calls)
            .iter()
            .filter(|(k, _)| k == api_key)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn order_count(&self) -> usize {
        lock(&self.state.orders).len()
    }
}

impl ExchangeConnector for MockExchange {
    fn connect(&self, credentials: ApiCredentials) -> Arc<dyn ExchangeClient> {
        Arc::new(MockExchangeClient {
            state: self.state.clone(),
            api_key: credentials.api_key,
        })
    }
}

struct MockExchangeClient {
    state: Arc<MockExchangeState>,
    api_key: String,
}

impl MockExchangeClient {
    async fn record(&self, call: MockCall) -> Result<(), ExchangeError> {
        lock(&self.state.calls).push((self.api_key.clone(), call));
        let delay = *lock(&self.state.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match lock(&self.state.next_failure).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find_order(&self, symbol: &str, order_id: i64) -> Result<ExchangeOrder, ExchangeError> {
        lock(&self.state.orders)
            .get(&order_id)
            .filter(|o| o.symbol == symbol)
            .cloned()
            .ok_or_else(|| ExchangeError::OrderNotFound(format!("order {} on {}", order_id, symbol)))
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    async fn start_user_stream(&self) -> Result<String, ExchangeError> {
        self.record(MockCall::StartUserStream).await?;
        Ok(lock(&self.state.stream_key).clone())
    }

    async fn keep_alive_user_stream(&self, stream_key: &str) -> Result<(), ExchangeError> {
        self.record(MockCall::KeepAlive(stream_key.to_string())).await
    }

    async fn create_order(&self, request: NewOrderRequest) -> Result<ExchangeOrder, ExchangeError> {
        self.record(MockCall::CreateOrder {
            symbol: request.symbol.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
        })
        .await?;
        let order_id = self.state.next_order_id.fetch_add(1, Ordering::SeqCst);
        let now_ms = Utc::now().timestamp_millis();
        let order = ExchangeOrder {
            symbol: request.symbol,
            order_id,
            client_order_id: format!("mock-{}", uuid::Uuid::new_v4().simple()),
            price: request.price,
            orig_qty: request.quantity,
            executed_qty: Decimal::ZERO,
            status: "NEW".to_string(),
            time_in_force: request.time_in_force.as_str().to_string(),
            order_type: request.order_type.as_str().to_string(),
            side: request.side.as_str().to_string(),
            time: Some(now_ms),
            update_time: Some(now_ms),
        };
        lock(&self.state.orders).insert(order_id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, symbol: &str, order_id: i64) -> Result<ExchangeOrder, ExchangeError> {
        self.record(MockCall::GetOrder {
            symbol: symbol.to_string(),
            order_id,
        })
        .await?;
        self.find_order(symbol, order_id)
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: i64,
    ) -> Result<ExchangeOrder, ExchangeError> {
        self.record(MockCall::CancelOrder {
            symbol: symbol.to_string(),
            order_id,
        })
        .await?;
        self.find_order(symbol, order_id)?;
        let mut orders = lock(&self.state.orders);
        let order = orders
            .get_mut(&order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
        order.status = "CANCELED".to_string();
        Ok(order.clone())
    }

    async fn list_open_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrder>, ExchangeError> {
        self.record(MockCall::ListOpenOrders(symbol.to_string())).await?;
        let mut orders: Vec<ExchangeOrder> = lock(&self.state.orders)
            .values()
            .filter(|o| o.symbol == symbol && o.status == "NEW")
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.order_id);
        Ok(orders)
    }

    async fn list_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrder>, ExchangeError> {
        self.record(MockCall::ListOrders(symbol.to_string())).await?;
        let mut orders: Vec<ExchangeOrder> = lock(&self.state.orders)
            .values()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.order_id);
        Ok(orders)
    }

    async fn get_account(&self) -> Result<AccountInfo, ExchangeError> {
        self.record(MockCall::Account).await?;
        Ok(AccountInfo {
            maker_commission: 10,
            taker_commission: 10,
            can_trade: true,
            can_withdraw: true,
            can_deposit: true,
            update_time: 0,
            balances: vec![Balance {
                asset: "USDT".to_string(),
                free: Decimal::new(100_000, 2),
                locked: Decimal::ZERO,
            }],
        })
    }

    async fn get_deposit_address(&self, coin: &str) -> Result<DepositAddress, ExchangeError> {
        self.record(MockCall::DepositAddress(coin.to_string())).await?;
        Ok(DepositAddress {
            coin: coin.to_string(),
            address: format!("mock-address-{}", coin.to_lowercase()),
            tag: String::new(),
            url: String::new(),
        })
    }

    async fn get_depth(&self, symbol: &str) -> Result<OrderBook, ExchangeError> {
        self.record(MockCall::Depth(symbol.to_string())).await?;
        Ok(OrderBook {
            symbol: symbol.to_string(),
            last_update_id: 1,
            bids: vec![PriceLevel {
                price: Decimal::new(9_999, 2),
                quantity: Decimal::ONE,
            }],
            asks: vec![PriceLevel {
                price: Decimal::new(10_001, 2),
                quantity: Decimal::ONE,
            }],
        })
    }
}
