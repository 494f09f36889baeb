use hmac::{Hmac, Mac};
use sha2::Sha256;
use stratbot_core::exchange::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// # Summary
/// 计算 Binance 签名接口所需的 `signature` 参数。
///
/// # Logic
/// 以 `secret_key` 为密钥，对完整查询串 (含 `recvWindow` 与 `timestamp`) 做 HMAC-SHA256，
/// 结果取小写十六进制。
///
/// # Arguments
/// * `secret_key` - 用户的 Secret Key。
/// * `payload` - 已编码的查询串，不含 `signature` 本身。
///
/// # Returns
/// * `Result<String, ExchangeError>` - 64 位十六进制签名。
pub fn sign_query(secret_key: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| ExchangeError::Transport(format!("failed to create signing key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
