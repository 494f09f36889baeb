//! # stratbot-store
//!
//! 基于 SQLite 的存储端口实现。用户、凭证绑定、机器人与本地订单共享一个数据库文件。

pub mod binding;
pub mod order;
pub mod robot;
pub mod system;

pub use system::SqliteSystemStore;
