use crate::error::ManagerError;
use std::future::Future;
use std::time::Duration;
use stratbot_core::exchange::error::ExchangeError;
use tracing::warn;

/// # Summary
/// 在截止时间内执行一次交易所调用，并把结果映射为 `ManagerError`。
///
/// # Logic
/// 超时与除 "订单不存在" 以外的交易所失败记为 warn，随后转换为 `Upstream`。
pub(crate) async fn call_upstream<T, F>(
    operation: &'static str,
    deadline: Duration,
    call: F,
) -> Result<T, ManagerError>
where
    F: Future<Output = Result<T, ExchangeError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(ExchangeError::OrderNotFound(msg))) => Err(ManagerError::NotFound(msg)),
        Ok(Err(e)) => {
            warn!(operation, error = %e, "exchange call failed");
            Err(e.into())
        }
        Err(_) => {
            warn!(operation, ?deadline, "exchange call timed out");
            Err(ExchangeError::Timeout.into())
        }
    }
}
