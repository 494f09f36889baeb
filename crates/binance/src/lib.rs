//! # stratbot-binance
//!
//! `ExchangeClient` 的 Binance 现货 REST 实现。
//!
//! 每个请求以用户自己的密钥对构造一个 [`BinanceClient`]，底层 HTTP 连接池在
//! [`BinanceConnector`] 中共享。签名接口使用 HMAC-SHA256 对查询串签名。

pub mod client;
pub mod sign;
mod wire;

pub use client::{BinanceConfig, BinanceConnector, BinanceClient};
