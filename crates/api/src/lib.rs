//! # `stratbot-api` - HTTP API 网关
//!
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 对受保护路由执行 Bearer 令牌鉴权，把 `Principal` 注入请求扩展
//! - 调用 `stratbot-manager` 中的各服务完成业务操作
//! - 将领域模型显式转换为 DTO，并统一包装为 `{success, message, errors, data}` 信封

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;
