//! 路由控制器，按资源分组。所有路径位于 `/api/v1` 之下。

pub mod auth;
pub mod binding;
pub mod order;
pub mod robot;
pub mod stream;
pub mod user;
