// ==========================================
// 客户账户导入系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 口径: 单条记录或单个连接级别,不中断兄弟记录/分块
// ==========================================

use thiserror::Error;

/// 持久化错误
#[derive(Error, Debug)]
pub enum StorageError {
    // ===== 连接错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 语句错误 =====
    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    StorageError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    StorageError::ForeignKeyViolation(msg)
                } else {
                    StorageError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::SqliteFailure(code, None)
                if code.code == rusqlite::ErrorCode::CannotOpen =>
            {
                StorageError::DatabaseConnectionError(err.to_string())
            }
            _ => StorageError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type StorageResult<T> = Result<T, StorageError>;
