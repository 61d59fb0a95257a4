// ==========================================
// 客户账户导入系统 - 配置层
// ==========================================
// 职责: 导入参数、加密密钥、数据库路径
// 存储: config_kv 表 + 环境变量
// ==========================================

pub mod config_manager;
pub mod ingest_config;

use crate::encryption::EncryptionError;
use thiserror::Error;

// 重导出核心配置
pub use config_manager::{config_keys, get_default_db_path, ConfigManager};
pub use ingest_config::{AccountOrdering, IngestConfig, NationalIdInput};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置值非法 (key={key}, value={value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置读取失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
