//! # 身份解析
//!
//! 从 `Authorization: Bearer <token>` 头中解析出当前请求的调用者 (`Principal`)。
//! 令牌的签名与过期校验交给 [`TokenVerifier`]，本模块只负责头部格式与 `user_id` 声明的解释。

use crate::error::ManagerError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use stratbot_core::common::UserId;
use stratbot_core::common::time::{RealTimeProvider, TimeProvider};
use stratbot_core::config::ServerConfig;

const BEARER_PREFIX: &str = "Bearer ";
const USER_ID_CLAIM: &str = "user_id";

/// 令牌解码后的全部声明
pub type Claims = Map<String, Value>;

/// 当前请求的调用者，只存在于单个请求内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
}

/// # Summary
/// 令牌校验原语：验证签名与有效期，返回声明集合。
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, ManagerError>;
}

/// 签发结果
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// 有效期 (秒)
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    user_id: i64,
    iss: String,
    iat: i64,
    exp: i64,
}

/// # Summary
/// HS256 JWT 的签发与校验。
///
/// # Invariants
/// - 校验要求 `exp` 存在且未过期，`iss` 必须与配置一致。
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_secs: u64,
    clock: Arc<dyn TimeProvider>,
}

impl JwtService {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_secs: u64) -> Self {
        Self::with_clock(secret, issuer, ttl_secs, Arc::new(RealTimeProvider))
    }

    pub fn with_clock(
        secret: &str,
        issuer: impl Into<String>,
        ttl_secs: u64,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl_secs,
            clock,
        }
    }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new(&cfg.jwt_secret, cfg.jwt_issuer.clone(), cfg.token_ttl_secs)
    }

    /// # Summary
    /// 为用户签发访问令牌。
    ///
    /// # Arguments
    /// * `user_id` - 令牌主体。
    ///
    /// # Returns
    /// * `Result<IssuedToken, ManagerError>` - 令牌与有效期；编码失败为 `Internal`。
    pub fn issue(&self, user_id: UserId) -> Result<IssuedToken, ManagerError> {
        let iat = self.clock.now().timestamp();
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            user_id: user_id.0,
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ManagerError::Internal(format!("failed to sign token: {e}")))?;
        Ok(IssuedToken {
            token,
            expires_in: self.ttl_secs,
        })
    }
}

impl TokenVerifier for JwtService {
    fn verify(&self, token: &str) -> Result<Claims, ManagerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ManagerError::InvalidToken(e.to_string()))
    }
}

/// # Summary
/// 从声明中取出正整数用户 ID，兼容 JSON 数字与数字字符串两种写法。
pub fn user_id_from_claims(claims: &Claims) -> Result<UserId, ManagerError> {
    let raw = claims
        .get(USER_ID_CLAIM)
        .ok_or_else(|| ManagerError::InvalidToken("missing user_id claim".to_string()))?;
    let id = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match id {
        Some(id) if id > 0 => Ok(UserId(id)),
        _ => Err(ManagerError::InvalidToken(format!("malformed user_id claim: {raw}"))),
    }
}

/// # Summary
/// 请求身份解析器。
///
/// # Invariants
/// - 无副作用，不访问存储。
#[derive(Clone)]
pub struct IdentityContext {
    verifier: Arc<dyn TokenVerifier>,
}

impl IdentityContext {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// # Summary
    /// 由 Authorization 头解析调用者。
    ///
    /// # Logic
    /// 1. 头缺失、非 `Bearer ` 前缀或令牌为空 → `Unauthenticated`。
    /// 2. 交由 `TokenVerifier` 校验签名与有效期 → 失败为 `InvalidToken`。
    /// 3. 解释 `user_id` 声明 → 缺失或非正整数为 `InvalidToken`。
    ///
    /// # Arguments
    /// * `header` - 原始头部值；无法解码为文本的头部应以 `None` 传入。
    pub fn authenticate(&self, header: Option<&str>) -> Result<Principal, ManagerError> {
        let token = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ManagerError::Unauthenticated)?;

        let claims = self.verifier.verify(token)?;
        let user_id = user_id_from_claims(&claims)?;
        Ok(Principal { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use stratbot_core::common::time::FakeClockProvider;

    const SECRET: &str = "unit-test-secret";

    fn context() -> (IdentityContext, Arc<JwtService>) {
        let jwt = Arc::new(JwtService::new(SECRET, "stratbot", 3600));
        (IdentityContext::new(jwt.clone()), jwt)
    }

    fn sign_raw(claims: Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode")
    }

    #[test]
    fn test_issued_token_authenticates() {
        let (ctx, jwt) = context();
        let issued = jwt.issue(UserId(42)).expect("issue");
        assert_eq!(issued.expires_in, 3600);
        let header = format!("Bearer {}", issued.token);
        let principal = ctx.authenticate(Some(&header)).expect("auth");
        assert_eq!(principal.user_id, UserId(42));
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthenticated() {
        let (ctx, _) = context();
        for header in [None, Some(""), Some("Basic abc"), Some("Bearer "), Some("Bearer    ")] {
            assert!(matches!(
                ctx.authenticate(header),
                Err(ManagerError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn test_bad_signature_is_invalid_token() {
        let (ctx, _) = context();
        let other = JwtService::new("another-secret", "stratbot", 3600);
        let token = other.issue(UserId(1)).expect("issue").token;
        assert!(matches!(
            ctx.authenticate(Some(&format!("Bearer {token}"))),
            Err(ManagerError::InvalidToken(_))
        ));
        assert!(matches!(
            ctx.authenticate(Some("Bearer not-a-jwt")),
            Err(ManagerError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let clock = Arc::new(FakeClockProvider::new(Utc::now() - Duration::days(2)));
        let stale = JwtService::with_clock(SECRET, "stratbot", 3600, clock);
        let token = stale.issue(UserId(7)).expect("issue").token;
        let (ctx, _) = context();
        assert!(matches!(
            ctx.authenticate(Some(&format!("Bearer {token}"))),
            Err(ManagerError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_user_id_claim_forms() {
        let (ctx, _) = context();
        let exp = Utc::now().timestamp() + 600;

        let as_string = sign_raw(json!({ "user_id": "15", "iss": "stratbot", "exp": exp }));
        let principal = ctx
            .authenticate(Some(&format!("Bearer {as_string}")))
            .expect("string id");
        assert_eq!(principal.user_id, UserId(15));

        for bad in [json!(0), json!(-3), json!("abc"), json!(1.5), json!(null)] {
            let token = sign_raw(json!({ "user_id": bad, "iss": "stratbot", "exp": exp }));
            assert!(matches!(
                ctx.authenticate(Some(&format!("Bearer {token}"))),
                Err(ManagerError::InvalidToken(_))
            ));
        }

        let missing = sign_raw(json!({ "iss": "stratbot", "exp": exp }));
        assert!(matches!(
            ctx.authenticate(Some(&format!("Bearer {missing}"))),
            Err(ManagerError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_token_without_exp_is_rejected() {
        let (ctx, _) = context();
        let token = sign_raw(json!({ "user_id": 3, "iss": "stratbot" }));
        assert!(matches!(
            ctx.authenticate(Some(&format!("Bearer {token}"))),
            Err(ManagerError::InvalidToken(_))
        ));
    }
}
