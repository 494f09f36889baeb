use crate::error::ManagerError;
use crate::ownership::OwnershipGuard;
use std::sync::Arc;
use stratbot_core::common::time::TimeProvider;
use stratbot_core::common::{RobotId, UserId};
use stratbot_core::store::port::{NewRobot, OrderRecord, OrderStore, Robot, RobotStore};
use tracing::{info, warn};

const SYMBOL_MIN_LEN: usize = 2;
const SYMBOL_MAX_LEN: usize = 20;

/// # Summary
/// 规范化交易标的：去空白、转大写，要求 2~20 位 ASCII 字母数字。
pub fn normalize_symbol(raw: &str) -> Result<String, ManagerError> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid_len = (SYMBOL_MIN_LEN..=SYMBOL_MAX_LEN).contains(&symbol.len());
    if !valid_len || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ManagerError::Validation(format!(
            "symbol must be {}-{} ASCII letters or digits",
            SYMBOL_MIN_LEN, SYMBOL_MAX_LEN
        )));
    }
    Ok(symbol)
}

/// # Summary
/// 机器人注册表。每个用户至多拥有一个机器人。
///
/// # Invariants
/// - 机器人不存在为 `NotFound`，属于他人为 `Forbidden`，两者不混用。
pub struct RobotRegistry {
    robots: Arc<dyn RobotStore>,
    orders: Arc<dyn OrderStore>,
    clock: Arc<dyn TimeProvider>,
}

impl RobotRegistry {
    pub fn new(
        robots: Arc<dyn RobotStore>,
        orders: Arc<dyn OrderStore>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            robots,
            orders,
            clock,
        }
    }

    /// # Summary
    /// 创建机器人。
    ///
    /// # Logic
    /// 1. 规范化标的。
    /// 2. 用户已有机器人 (无论标的是否相同) 则 `Conflict`。
    /// 3. 插入；并发插入由 `robots.user_id` 唯一约束兜底。
    pub async fn create(&self, user_id: UserId, symbol: &str) -> Result<Robot, ManagerError> {
        let symbol = normalize_symbol(symbol)?;
        if let Some(existing) = self.robots.find_robot_by_user(user_id).await? {
            warn!(user = %user_id, robot = %existing.id, "user already owns a robot");
            return Err(ManagerError::Conflict("user already owns a robot".to_string()));
        }
        let robot = self
            .robots
            .insert_robot(&NewRobot {
                owner: user_id,
                symbol,
                created_at: self.clock.now(),
            })
            .await?;
        info!(user = %user_id, robot = %robot.id, symbol = %robot.symbol, "robot created");
        Ok(robot)
    }

    /// 读出机器人并校验所有权
    pub async fn get(&self, user_id: UserId, robot_id: RobotId) -> Result<Robot, ManagerError> {
        let robot = self
            .robots
            .get_robot(robot_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("robot {}", robot_id)))?;
        OwnershipGuard::ensure_owner(user_id, &robot)?;
        Ok(robot)
    }

    pub async fn find_for_owner(&self, user_id: UserId) -> Result<Option<Robot>, ManagerError> {
        Ok(self.robots.find_robot_by_user(user_id).await?)
    }

    pub async fn update(
        &self,
        user_id: UserId,
        robot_id: RobotId,
        symbol: &str,
    ) -> Result<Robot, ManagerError> {
        let robot = self.get(user_id, robot_id).await?;
        let symbol = normalize_symbol(symbol)?;
        let updated = self.robots.update_robot_symbol(robot.id, &symbol).await?;
        info!(user = %user_id, robot = %robot.id, symbol = %updated.symbol, "robot updated");
        Ok(updated)
    }

    /// 删除机器人，其本地订单由存储层级联删除
    pub async fn delete(&self, user_id: UserId, robot_id: RobotId) -> Result<(), ManagerError> {
        let robot = self.get(user_id, robot_id).await?;
        self.robots.delete_robot(robot.id).await?;
        info!(user = %user_id, robot = %robot.id, "robot deleted");
        Ok(())
    }

    /// 解析调用者拥有的机器人所交易的标的
    pub async fn resolve_symbol_for_owner(
        &self,
        user_id: UserId,
        robot_id: RobotId,
    ) -> Result<String, ManagerError> {
        Ok(self.get(user_id, robot_id).await?.symbol)
    }

    /// 机器人的本地下单记录，按时间倒序
    pub async fn local_orders(
        &self,
        user_id: UserId,
        robot_id: RobotId,
    ) -> Result<Vec<OrderRecord>, ManagerError> {
        let robot = self.get(user_id, robot_id).await?;
        Ok(self.orders.list_orders_by_robot(robot.id).await?)
    }
}
