use super::error::StoreError;
use crate::common::{BindingId, RobotId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// # Summary
/// 用户实体，代表系统的使用者。
///
/// # Invariants
/// - `id` 全局唯一，由存储层分配。
/// - `email` 全局唯一。
/// - `password_hash` 为 bcrypt 摘要，永不序列化输出。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    // 用户唯一标识
    pub id: UserId,
    // 用户显示名称
    pub name: String,
    // 登录邮箱
    pub email: String,
    // bcrypt 密码摘要
    #[serde(skip_serializing)]
    pub password_hash: String,
    // 注册时间
    pub created_at: DateTime<Utc>,
    // 最后更新时间
    pub updated_at: DateTime<Utc>,
}

/// 待写入的新用户
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// # Summary
/// 交易所凭证绑定，一个用户至多拥有一条。
///
/// # Invariants
/// - 同一 `owner` 在任意时刻至多存在一条记录 (存储层 UNIQUE 约束为最终保证)。
/// - `stream_key` 与 `streamed_at` 同时为空或同时有值。
/// - `secret_key` 不参与序列化与 Debug 输出。
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialBinding {
    pub id: BindingId,
    pub owner: UserId,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    // 交易所下发的用户数据流 listenKey
    pub stream_key: Option<String>,
    pub bound_at: DateTime<Utc>,
    pub streamed_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for CredentialBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBinding")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("api_key", &self.api_key)
            .field("secret_key", &"***")
            .field("stream_key", &self.stream_key)
            .field("bound_at", &self.bound_at)
            .field("streamed_at", &self.streamed_at)
            .finish()
    }
}

/// 待写入的新凭证绑定
#[derive(Clone)]
pub struct NewBinding {
    pub owner: UserId,
    pub api_key: String,
    pub secret_key: String,
    pub bound_at: DateTime<Utc>,
}

/// # Summary
/// 交易机器人，以其交易的标的代码标识。
///
/// # Invariants
/// - 每个用户至多拥有一个机器人，因此 `(owner, symbol)` 亦唯一。
/// - `symbol` 已规范化为大写。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
    pub owner: UserId,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

/// 待写入的新机器人
#[derive(Debug, Clone)]
pub struct NewRobot {
    pub owner: UserId,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

/// # Summary
/// 本地订单记录，仅在交易所受理下单后创建，此后不可变。
///
/// # Invariants
/// - 归属关系经由 `robot_id` 传递到机器人的所有者。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub robot_id: RobotId,
    // 交易所分配的订单号
    pub exchange_order_id: i64,
    pub client_order_id: String,
    pub ordered_at: DateTime<Utc>,
}

/// 待写入的新订单记录
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub robot_id: RobotId,
    pub exchange_order_id: i64,
    pub client_order_id: String,
    pub ordered_at: DateTime<Utc>,
}

/// # Summary
/// 用户持久化接口。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// # Summary
    /// 创建用户。
    ///
    /// # Returns
    /// 返回带有存储层分配 ID 的用户；邮箱重复时返回 `StoreError::Conflict`。
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError>;

    /// 根据 ID 获取用户，不存在返回 `None`。
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// 根据邮箱获取用户，不存在返回 `None`。
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// # Summary
    /// 更新用户资料 (name / email / password_hash / updated_at)。
    ///
    /// # Returns
    /// 返回更新后的用户；记录不存在返回 `NotFound`，邮箱冲突返回 `Conflict`。
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;
}

/// # Summary
/// 凭证绑定持久化接口。
///
/// # Invariants
/// - 实现者必须对 `owner` 施加唯一约束，并将冲突映射为 `StoreError::Conflict`。
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// # Summary
    /// 插入新的凭证绑定。
    ///
    /// # Logic
    /// 单行插入，依赖唯一约束拒绝同一用户的第二条记录。
    ///
    /// # Arguments
    /// * `binding`: 待插入的绑定。
    ///
    /// # Returns
    /// 插入后的完整记录，或 `StoreError::Conflict`。
    async fn insert_binding(&self, binding: &NewBinding) -> Result<CredentialBinding, StoreError>;

    /// 根据主键获取绑定。
    async fn get_binding(&self, id: BindingId) -> Result<Option<CredentialBinding>, StoreError>;

    /// 根据所有者获取绑定。
    async fn find_binding_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<CredentialBinding>, StoreError>;

    /// # Summary
    /// 替换密钥对。
    ///
    /// # Logic
    /// 写入新的 `api_key` / `secret_key`，同时清空 `stream_key` 与 `streamed_at`，
    /// `bound_at` 保持不变。
    ///
    /// # Returns
    /// 更新后的记录；不存在返回 `NotFound`。
    async fn update_binding_keys(
        &self,
        id: BindingId,
        api_key: &str,
        secret_key: &str,
    ) -> Result<CredentialBinding, StoreError>;

    /// # Summary
    /// 写入用户数据流密钥，覆盖旧值。
    ///
    /// # Returns
    /// 更新后的记录；不存在返回 `NotFound`。
    async fn set_stream_key(
        &self,
        id: BindingId,
        stream_key: &str,
        streamed_at: DateTime<Utc>,
    ) -> Result<CredentialBinding, StoreError>;

    /// 删除绑定；不存在返回 `NotFound`。
    async fn delete_binding(&self, id: BindingId) -> Result<(), StoreError>;
}

/// # Summary
/// 机器人持久化接口。
///
/// # Invariants
/// - 实现者必须对 `owner` 施加唯一约束。
#[async_trait]
pub trait RobotStore: Send + Sync {
    async fn insert_robot(&self, robot: &NewRobot) -> Result<Robot, StoreError>;

    async fn get_robot(&self, id: RobotId) -> Result<Option<Robot>, StoreError>;

    async fn find_robot_by_user(&self, user_id: UserId) -> Result<Option<Robot>, StoreError>;

    /// 修改交易标的；不存在返回 `NotFound`。
    async fn update_robot_symbol(&self, id: RobotId, symbol: &str) -> Result<Robot, StoreError>;

    /// 删除机器人及其级联的本地订单；不存在返回 `NotFound`。
    async fn delete_robot(&self, id: RobotId) -> Result<(), StoreError>;
}

/// # Summary
/// 本地订单记录持久化接口。
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, StoreError>;

    /// 按下单时间倒序列出机器人的本地订单。
    async fn list_orders_by_robot(&self, robot_id: RobotId) -> Result<Vec<OrderRecord>, StoreError>;
}
