use crate::system::{SqliteSystemStore, map_db_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stratbot_core::common::RobotId;
use stratbot_core::store::error::StoreError;
use stratbot_core::store::port::{NewOrder, OrderRecord, OrderStore};

type OrderRow = (i64, i64, i64, String, DateTime<Utc>);

fn order_from_row(r: OrderRow) -> OrderRecord {
    OrderRecord {
        id: r.0,
        robot_id: RobotId(r.1),
        exchange_order_id: r.2,
        client_order_id: r.3,
        ordered_at: r.4,
    }
}

#[async_trait]
impl OrderStore for SqliteSystemStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, StoreError> {
        sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (robot_id, exchange_order_id, client_order_id, ordered_at) VALUES (?, ?, ?, ?) \
             RETURNING id, robot_id, exchange_order_id, client_order_id, ordered_at",
        )
        .bind(order.robot_id.0)
        .bind(order.exchange_order_id)
        .bind(&order.client_order_id)
        .bind(order.ordered_at)
        .fetch_one(&self.pool)
        .await
        .map(order_from_row)
        .map_err(map_db_error)
    }

    async fn list_orders_by_robot(&self, robot_id: RobotId) -> Result<Vec<OrderRecord>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, robot_id, exchange_order_id, client_order_id, ordered_at FROM orders \
             WHERE robot_id = ? ORDER BY ordered_at DESC, id DESC",
        )
        .bind(robot_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(order_from_row).collect())
    }
}
