use crate::error::ManagerError;
use crate::identity::{IssuedToken, JwtService};
use std::sync::Arc;
use stratbot_core::common::UserId;
use stratbot_core::common::time::TimeProvider;
use stratbot_core::store::port::{NewUser, User, UserStore};
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 6;

/// 注册请求
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// 资料修改，`None` 表示保持不变
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

fn normalize_email(raw: &str) -> Result<String, ManagerError> {
    let email = raw.trim().to_ascii_lowercase();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(ManagerError::Validation("email is not valid".to_string()));
    }
    Ok(email)
}

fn normalize_name(raw: &str) -> Result<String, ManagerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ManagerError::Validation("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn check_password(password: &str) -> Result<(), ManagerError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ManagerError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// # Summary
/// 用户账户服务：注册、登录签发令牌、查看与修改资料。
///
/// # Invariants
/// - 邮箱统一转小写后存储，唯一性由存储层最终保证。
/// - 密码只以 bcrypt 摘要落库。
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<JwtService>,
    clock: Arc<dyn TimeProvider>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<JwtService>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            users,
            tokens,
            clock,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// 指定 bcrypt 计算强度
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    fn hash_password(&self, password: &str) -> Result<String, ManagerError> {
        bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|e| ManagerError::Internal(format!("failed to hash password: {e}")))
    }

    /// # Summary
    /// 注册新用户。
    ///
    /// # Logic
    /// 1. 校验名称、邮箱与密码长度。
    /// 2. 邮箱已被占用 → `Conflict`。
    /// 3. 计算 bcrypt 摘要并写入。
    pub async fn register(&self, req: Registration) -> Result<User, ManagerError> {
        let name = normalize_name(&req.name)?;
        let email = normalize_email(&req.email)?;
        check_password(&req.password)?;

        if self.users.find_user_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(ManagerError::Conflict("email already registered".to_string()));
        }

        let user = self
            .users
            .create_user(&NewUser {
                name,
                email,
                password_hash: self.hash_password(&req.password)?,
                created_at: self.clock.now(),
            })
            .await?;
        info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// # Summary
    /// 校验邮箱与密码并签发令牌。
    ///
    /// # Returns
    /// * `Unauthenticated` - 用户不存在或密码错误，两者不做区分。
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken), ManagerError> {
        let email = email.trim().to_ascii_lowercase();
        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(ManagerError::Unauthenticated)?;

        if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
            warn!(user = %user.id, "login rejected: wrong password");
            return Err(ManagerError::Unauthenticated);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user = %user.id, "user logged in");
        Ok((user, token))
    }

    pub async fn profile(&self, user_id: UserId) -> Result<User, ManagerError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("user {}", user_id)))
    }

    /// 修改调用者资料；新邮箱被他人占用为 `Conflict`
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, ManagerError> {
        let mut user = self.profile(user_id).await?;

        if let Some(name) = update.name.as_deref() {
            user.name = normalize_name(name)?;
        }
        if let Some(email) = update.email.as_deref() {
            let email = normalize_email(email)?;
            if email != user.email {
                if let Some(other) = self.users.find_user_by_email(&email).await? {
                    if other.id != user.id {
                        warn!(user = %user_id, "email already registered");
                        return Err(ManagerError::Conflict("email already registered".to_string()));
                    }
                }
                user.email = email;
            }
        }
        if let Some(password) = update.password.as_deref() {
            check_password(password)?;
            user.password_hash = self.hash_password(password)?;
        }
        user.updated_at = self.clock.now();

        let updated = self.users.update_user(&user).await?;
        info!(user = %user_id, "profile updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(
            normalize_email(" Alice@Example.COM ").ok().as_deref(),
            Some("alice@example.com")
        );
        assert!(normalize_email("alice").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("alice@localhost").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(check_password("12345").is_err());
        assert!(check_password("123456").is_ok());
    }
}
