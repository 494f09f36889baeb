use crate::error::ManagerError;
use crate::ownership::OwnershipGuard;
use crate::upstream::call_upstream;
use std::sync::Arc;
use std::time::Duration;
use stratbot_core::common::time::TimeProvider;
use stratbot_core::common::{BindingId, UserId};
use stratbot_core::exchange::entity::ApiCredentials;
use stratbot_core::exchange::port::{ExchangeClient, ExchangeConnector};
use stratbot_core::store::port::{CredentialBinding, CredentialStore, NewBinding};
use tracing::{info, warn};

fn validate_keys(api_key: &str, secret_key: &str) -> Result<(), ManagerError> {
    if api_key.trim().is_empty() {
        return Err(ManagerError::Validation("api_key must not be empty".to_string()));
    }
    if secret_key.trim().is_empty() {
        return Err(ManagerError::Validation("secret_key must not be empty".to_string()));
    }
    Ok(())
}

/// # Summary
/// 凭证绑定管理器，维护 "每个用户至多一条绑定" 与用户数据流密钥的生命周期。
///
/// # Invariants
/// - 更新与解绑前总是对读出的记录做所有权校验。
/// - 交易所客户端按调用现建，不缓存任何凭证。
pub struct CredentialBindingManager {
    store: Arc<dyn CredentialStore>,
    connector: Arc<dyn ExchangeConnector>,
    clock: Arc<dyn TimeProvider>,
    call_timeout: Duration,
}

impl CredentialBindingManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        connector: Arc<dyn ExchangeConnector>,
        clock: Arc<dyn TimeProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            connector,
            clock,
            call_timeout,
        }
    }

    /// 单次交易所调用的截止时间
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// # Summary
    /// 为用户创建绑定。
    ///
    /// # Logic
    /// 1. 校验密钥非空。
    /// 2. 先查询是否已绑定，已存在直接返回 `Conflict`。
    /// 3. 插入；并发插入由存储层唯一约束兜底，同样映射为 `Conflict`。
    pub async fn bind(
        &self,
        user_id: UserId,
        api_key: &str,
        secret_key: &str,
    ) -> Result<CredentialBinding, ManagerError> {
        validate_keys(api_key, secret_key)?;

        if self.store.find_binding_by_user(user_id).await?.is_some() {
            warn!(user = %user_id, "binding already exists");
            return Err(ManagerError::Conflict("credentials already bound".to_string()));
        }

        let binding = self
            .store
            .insert_binding(&NewBinding {
                owner: user_id,
                api_key: api_key.trim().to_string(),
                secret_key: secret_key.trim().to_string(),
                bound_at: self.clock.now(),
            })
            .await?;
        info!(user = %user_id, binding = %binding.id, "credentials bound");
        Ok(binding)
    }

    async fn owned_binding(
        &self,
        user_id: UserId,
        binding_id: BindingId,
    ) -> Result<CredentialBinding, ManagerError> {
        let binding = self
            .store
            .get_binding(binding_id)
            .await?
            .ok_or_else(|| ManagerError::NotFound(format!("binding {}", binding_id)))?;
        OwnershipGuard::ensure_owner(user_id, &binding)?;
        Ok(binding)
    }

    /// # Summary
    /// 替换密钥对。旧的数据流密钥随之作废，`bound_at` 不变。
    pub async fn update(
        &self,
        user_id: UserId,
        binding_id: BindingId,
        api_key: &str,
        secret_key: &str,
    ) -> Result<CredentialBinding, ManagerError> {
        let binding = self.owned_binding(user_id, binding_id).await?;
        validate_keys(api_key, secret_key)?;
        let updated = self
            .store
            .update_binding_keys(binding.id, api_key.trim(), secret_key.trim())
            .await?;
        info!(user = %user_id, binding = %binding.id, "credentials updated");
        Ok(updated)
    }

    pub async fn unbind(&self, user_id: UserId, binding_id: BindingId) -> Result<(), ManagerError> {
        let binding = self.owned_binding(user_id, binding_id).await?;
        self.store.delete_binding(binding.id).await?;
        info!(user = %user_id, binding = %binding.id, "credentials unbound");
        Ok(())
    }

    /// 调用者自己的绑定列表 (至多一条)
    pub async fn list_for_owner(&self, user_id: UserId) -> Result<Vec<CredentialBinding>, ManagerError> {
        Ok(self.store.find_binding_by_user(user_id).await?.into_iter().collect())
    }

    /// 取出调用者的绑定，不存在为 `NotBound`
    pub async fn require_binding(&self, user_id: UserId) -> Result<CredentialBinding, ManagerError> {
        self.store
            .find_binding_by_user(user_id)
            .await?
            .ok_or(ManagerError::NotBound)
    }

    /// 以调用者的凭证构造交易所客户端
    pub async fn client_for(&self, user_id: UserId) -> Result<Arc<dyn ExchangeClient>, ManagerError> {
        let binding = self.require_binding(user_id).await?;
        Ok(self.connector.connect(ApiCredentials {
            api_key: binding.api_key,
            secret_key: binding.secret_key,
        }))
    }

    /// # Summary
    /// 开启用户数据流并保存 listenKey。
    ///
    /// # Logic
    /// 1. 取出绑定 (`NotBound`)。
    /// 2. 以绑定凭证调用交易所；失败或返回空 key 为 `Upstream`。
    /// 3. 覆盖保存 `stream_key` 与 `streamed_at`。
    pub async fn start_stream(&self, user_id: UserId) -> Result<String, ManagerError> {
        let binding = self.require_binding(user_id).await?;
        let client = self.connector.connect(ApiCredentials {
            api_key: binding.api_key.clone(),
            secret_key: binding.secret_key.clone(),
        });

        let stream_key = call_upstream(
            "start_user_stream",
            self.call_timeout,
            client.start_user_stream(),
        )
        .await?;
        if stream_key.trim().is_empty() {
            warn!(user = %user_id, "exchange returned an empty stream key");
            return Err(ManagerError::Upstream("exchange returned an empty stream key".to_string()));
        }

        self.store
            .set_stream_key(binding.id, &stream_key, self.clock.now())
            .await?;
        info!(user = %user_id, binding = %binding.id, "user data stream started");
        Ok(stream_key)
    }

    /// 为已保存的 listenKey 续期，不轮换密钥
    pub async fn keep_alive(&self, user_id: UserId) -> Result<(), ManagerError> {
        let binding = self.require_binding(user_id).await?;
        let stream_key = binding.stream_key.clone().ok_or(ManagerError::NotBound)?;
        let client = self.connector.connect(ApiCredentials {
            api_key: binding.api_key,
            secret_key: binding.secret_key,
        });
        call_upstream(
            "keep_alive_user_stream",
            self.call_timeout,
            client.keep_alive_user_stream(&stream_key),
        )
        .await?;
        info!(user = %user_id, "user data stream kept alive");
        Ok(())
    }
}
