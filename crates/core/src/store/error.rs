use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库连接、读写失败与唯一约束冲突。
///
/// # Invariants
/// - 唯一约束冲突必须映射为 `Conflict`，上层依赖它作为并发写入的最终裁决。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
    /// 记录未找到
    #[error("Not found")]
    NotFound,
    /// 违反唯一约束
    #[error("Conflict: {0}")]
    Conflict(String),
    /// 初始化存储失败
    #[error("Initialization error: {0}")]
    InitError(String),
}
