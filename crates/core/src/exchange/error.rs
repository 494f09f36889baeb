use thiserror::Error;

/// # Summary
/// 交易所调用错误。
///
/// # Invariants
/// - 只有交易所明确报告 "订单不存在" 时才使用 `OrderNotFound`，其余业务拒绝一律为 `Rejected`。
#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("订单不存在: {0}")]
    OrderNotFound(String),
    #[error("交易所拒绝请求 (code {code}): {msg}")]
    Rejected { code: i64, msg: String },
    #[error("网络传输错误: {0}")]
    Transport(String),
    #[error("响应解析失败: {0}")]
    Decode(String),
    #[error("交易所调用超时")]
    Timeout,
}
