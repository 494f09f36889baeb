//! # `stratbot-core` - 领域模型与端口定义
//!
//! 本 crate 只包含实体、错误类型和 Trait 端口，不依赖任何具体基础设施。
//!
//! ## 模块划分
//! - `common`: 标识符新类型与时钟抽象
//! - `config`: 全局配置结构
//! - `store`: 用户 / 凭证绑定 / 机器人 / 订单的持久化端口
//! - `exchange`: 交易所能力端口 (下单、查询、用户数据流)
//! - `test_utils`: 内存仓储与可录制的模拟交易所 (需开启 `test-utils` feature)

pub mod common;
pub mod config;
pub mod exchange;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod test_utils;
