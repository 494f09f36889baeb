use crate::system::{SqliteSystemStore, map_db_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stratbot_core::common::{BindingId, UserId};
use stratbot_core::store::error::StoreError;
use stratbot_core::store::port::{CredentialBinding, CredentialStore, NewBinding};

type BindingRow = (
    i64,
    i64,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

const BINDING_COLUMNS: &str =
    "id, user_id, api_key, secret_key, stream_key, bound_at, streamed_at";

fn binding_from_row(r: BindingRow) -> CredentialBinding {
    CredentialBinding {
        id: BindingId(r.0),
        owner: UserId(r.1),
        api_key: r.2,
        secret_key: r.3,
        stream_key: r.4,
        bound_at: r.5,
        streamed_at: r.6,
    }
}

#[async_trait]
impl CredentialStore for SqliteSystemStore {
    /// # Summary
    /// 插入凭证绑定。
    ///
    /// # Logic
    /// 不做先查后写，`user_id` 上的 UNIQUE 约束直接裁决并发的重复绑定。
    async fn insert_binding(&self, binding: &NewBinding) -> Result<CredentialBinding, StoreError> {
        let sql = format!(
            "INSERT INTO credential_bindings (user_id, api_key, secret_key, bound_at) VALUES (?, ?, ?, ?) RETURNING {}",
            BINDING_COLUMNS
        );
        sqlx::query_as::<_, BindingRow>(&sql)
            .bind(binding.owner.0)
            .bind(&binding.api_key)
            .bind(&binding.secret_key)
            .bind(binding.bound_at)
            .fetch_one(&self.pool)
            .await
            .map(binding_from_row)
            .map_err(map_db_error)
    }

    async fn get_binding(&self, id: BindingId) -> Result<Option<CredentialBinding>, StoreError> {
        let sql = format!("SELECT {} FROM credential_bindings WHERE id = ?", BINDING_COLUMNS);
        sqlx::query_as::<_, BindingRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(binding_from_row))
            .map_err(map_db_error)
    }

    async fn find_binding_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<CredentialBinding>, StoreError> {
        let sql = format!("SELECT {} FROM credential_bindings WHERE user_id = ?", BINDING_COLUMNS);
        sqlx::query_as::<_, BindingRow>(&sql)
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .map(|r| r.map(binding_from_row))
            .map_err(map_db_error)
    }

    async fn update_binding_keys(
        &self,
        id: BindingId,
        api_key: &str,
        secret_key: &str,
    ) -> Result<CredentialBinding, StoreError> {
        // 新密钥对下旧的 listenKey 失效
        let sql = format!(
            "UPDATE credential_bindings SET api_key = ?, secret_key = ?, stream_key = NULL, streamed_at = NULL \
             WHERE id = ? RETURNING {}",
            BINDING_COLUMNS
        );
        sqlx::query_as::<_, BindingRow>(&sql)
            .bind(api_key)
            .bind(secret_key)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(binding_from_row)
            .ok_or(StoreError::NotFound)
    }

    async fn set_stream_key(
        &self,
        id: BindingId,
        stream_key: &str,
        streamed_at: DateTime<Utc>,
    ) -> Result<CredentialBinding, StoreError> {
        let sql = format!(
            "UPDATE credential_bindings SET stream_key = ?, streamed_at = ? WHERE id = ? RETURNING {}",
            BINDING_COLUMNS
        );
        sqlx::query_as::<_, BindingRow>(&sql)
            .bind(stream_key)
            .bind(streamed_at)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(binding_from_row)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_binding(&self, id: BindingId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM credential_bindings WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
