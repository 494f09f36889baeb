use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::fs;
use std::path::Path;
use stratbot_core::common::UserId;
use stratbot_core::store::error::StoreError;
use stratbot_core::store::port::{NewUser, User, UserStore};
use tracing::info;

/// 默认系统数据库文件名
const DEFAULT_SYSTEM_DB: &str = "stratbot.db";

/// 用户表的行结构 (id, name, email, password_hash, created_at, updated_at)
type UserRow = (i64, String, String, String, DateTime<Utc>, DateTime<Utc>);

/// 将 sqlx 错误归类为存储层错误，唯一约束冲突单独识别。
pub(crate) fn map_db_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

/// 所有存储端口的 SQLite 实现。
///
/// # Summary
/// 在数据目录下的单个 SQLite 数据库中管理用户、凭证绑定、机器人与本地订单。
///
/// # Invariants
/// * 表结构在 `open` 时幂等初始化。
/// * 外键开启：删除用户级联删除其绑定与机器人，删除机器人级联删除其订单。
/// * `credential_bindings.user_id` 与 `robots.user_id` 均带 UNIQUE 约束，
///   是 "每用户至多一条" 的最终保证。
pub struct SqliteSystemStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteSystemStore {
    /// 打开 (必要时创建) 数据目录中的系统数据库。
    ///
    /// # Logic
    /// 1. 确保 `data_dir` 存在。
    /// 2. 以 `create_if_missing` 与外键约束打开连接池。
    /// 3. 执行 DDL 初始化表结构。
    ///
    /// # Arguments
    /// * `data_dir` - 数据根目录。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = data_dir.as_ref();
        fs::create_dir_all(root).map_err(|e| StoreError::InitError(e.to_string()))?;

        let db_path = root.join(DEFAULT_SYSTEM_DB);
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %db_path.display(), "system store opened");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS credential_bindings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                api_key TEXT NOT NULL,
                secret_key TEXT NOT NULL,
                stream_key TEXT,
                bound_at DATETIME NOT NULL,
                streamed_at DATETIME
            );

            CREATE TABLE IF NOT EXISTS robots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                symbol TEXT NOT NULL,
                created_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                robot_id INTEGER NOT NULL REFERENCES robots(id) ON DELETE CASCADE,
                exchange_order_id INTEGER NOT NULL,
                client_order_id TEXT NOT NULL,
                ordered_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_robot ON orders (robot_id, ordered_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;
        Ok(())
    }
}

fn user_from_row(r: UserRow) -> User {
    User {
        id: UserId(r.0),
        name: r.1,
        email: r.2,
        password_hash: r.3,
        created_at: r.4,
        updated_at: r.5,
    }
}

#[async_trait]
impl UserStore for SqliteSystemStore {
    /// # Summary
    /// 插入新用户。
    ///
    /// # Logic
    /// 单行 INSERT ... RETURNING，邮箱唯一约束冲突映射为 `Conflict`。
    async fn create_user(&self, user: &NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (name, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?) \
             RETURNING id, name, email, password_hash, created_at, updated_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map(user_from_row)
        .map_err(map_db_error)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(user_from_row))
        .map_err(map_db_error)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map(|r| r.map(user_from_row))
        .map_err(map_db_error)
    }

    /// # Summary
    /// 覆盖写入用户资料。
    ///
    /// # Returns
    /// * `NotFound` - 用户不存在。
    /// * `Conflict` - 新邮箱已被其他用户占用。
    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET name = ?, email = ?, password_hash = ?, updated_at = ? WHERE id = ? \
             RETURNING id, name, email, password_hash, created_at, updated_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .bind(user.id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(user_from_row)
        .ok_or(StoreError::NotFound)
    }
}
