//! # stratbot-manager
//!
//! 应用服务层：身份解析、所有权校验、凭证绑定、机器人注册与订单编排。
//! 只依赖 `stratbot-core` 中的端口定义，具体的存储与交易所实现由调用方注入。

pub mod account;
pub mod binding;
pub mod error;
pub mod identity;
pub mod order;
pub mod ownership;
pub mod robot;
mod upstream;

pub use error::ManagerError;
