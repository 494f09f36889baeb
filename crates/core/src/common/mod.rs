use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

pub mod time;

/// # Summary
/// 用户主键。由存储层自增分配，令牌中的 `user_id` 声明解析为此类型。
///
/// # Invariants
/// - 合法值严格为正数。
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// # Summary
/// 机器人主键。
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RobotId(pub i64);

/// # Summary
/// 交易所凭证绑定记录主键。
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct BindingId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
