use stratbot_core::exchange::error::ExchangeError;
use stratbot_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// Manager 层的统一错误类型，API 层据此决定 HTTP 状态码。
///
/// # Invariants
/// - 所有权校验失败一律为 `Forbidden`。
/// - 交易所失败一律为 `Upstream`，唯一例外是交易所明确报告的 "订单不存在" (`NotFound`)。
/// - `Internal` 的细节只用于日志，不返回给调用方。
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Access to this resource is forbidden")]
    Forbidden,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No exchange credentials bound")]
    NotBound,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Exchange error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ManagerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => ManagerError::Conflict(msg),
            StoreError::NotFound => ManagerError::NotFound("record not found".to_string()),
            other => ManagerError::Internal(other.to_string()),
        }
    }
}

impl From<ExchangeError> for ManagerError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::OrderNotFound(msg) => ManagerError::NotFound(msg),
            other => ManagerError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ManagerError::from(StoreError::Conflict("dup".into())),
            ManagerError::Conflict(_)
        ));
        assert!(matches!(
            ManagerError::from(StoreError::NotFound),
            ManagerError::NotFound(_)
        ));
        assert!(matches!(
            ManagerError::from(StoreError::Database("disk".into())),
            ManagerError::Internal(_)
        ));
    }

    #[test]
    fn test_exchange_error_mapping() {
        assert!(matches!(
            ManagerError::from(ExchangeError::OrderNotFound("1".into())),
            ManagerError::NotFound(_)
        ));
        assert!(matches!(
            ManagerError::from(ExchangeError::Timeout),
            ManagerError::Upstream(_)
        ));
        match ManagerError::from(ExchangeError::Rejected {
            code: -1013,
            msg: "Filter failure".into(),
        }) {
            ManagerError::Upstream(msg) => assert!(msg.contains("Filter failure")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
