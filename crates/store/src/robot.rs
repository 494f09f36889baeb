use crate::system::{SqliteSystemStore, map_db_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stratbot_core::common::{RobotId, UserId};
use stratbot_core::store::error::StoreError;
use stratbot_core::store::port::{NewRobot, Robot, RobotStore};

type RobotRow = (i64, i64, String, DateTime<Utc>);

fn robot_from_row(r: RobotRow) -> Robot {
    Robot {
        id: RobotId(r.0),
        owner: UserId(r.1),
        symbol: r.2,
        created_at: r.3,
    }
}

#[async_trait]
impl RobotStore for SqliteSystemStore {
    async fn insert_robot(&self, robot: &NewRobot) -> Result<Robot, StoreError> {
        sqlx::query_as::<_, RobotRow>(
            "INSERT INTO robots (user_id, symbol, created_at) VALUES (?, ?, ?) \
             RETURNING id, user_id, symbol, created_at",
        )
        .bind(robot.owner.0)
        .bind(&robot.symbol)
        .bind(robot.created_at)
        .fetch_one(&self.pool)
        .await
        .map(robot_from_row)
        .map_err(map_db_error)
    }

    async fn get_robot(&self, id: RobotId) -> Result<Option<Robot>, StoreError> {
        sqlx::query_as::<_, RobotRow>(
            "SELECT id, user_id, symbol, created_at FROM robots WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(robot_from_row))
        .map_err(map_db_error)
    }

    async fn find_robot_by_user(&self, user_id: UserId) -> Result<Option<Robot>, StoreError> {
        sqlx::query_as::<_, RobotRow>(
            "SELECT id, user_id, symbol, created_at FROM robots WHERE user_id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(robot_from_row))
        .map_err(map_db_error)
    }

    async fn update_robot_symbol(&self, id: RobotId, symbol: &str) -> Result<Robot, StoreError> {
        sqlx::query_as::<_, RobotRow>(
            "UPDATE robots SET symbol = ? WHERE id = ? RETURNING id, user_id, symbol, created_at",
        )
        .bind(symbol)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(robot_from_row)
        .ok_or(StoreError::NotFound)
    }

    /// # Summary
    /// 删除机器人。
    ///
    /// # Logic
    /// `orders.robot_id` 外键为 `ON DELETE CASCADE`，本地订单随之删除。
    async fn delete_robot(&self, id: RobotId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM robots WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
