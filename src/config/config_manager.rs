// ==========================================
// 客户账户导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 优先级: 环境变量 > config_kv(global) > 默认值
// ==========================================

use crate::config::ingest_config::IngestConfig;
use crate::config::{ConfigError, ConfigResult};
use crate::db::{configure_sqlite_connection, open_shared_connection, SharedConnection};
use crate::encryption::{AesGcmCipher, NationalIdCipher, PlainCipher};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, MutexGuard};
use tracing::{debug, info, warn};

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "BANK_INGEST_DB_PATH";

/// 身份证号加密密钥环境变量（64 位十六进制）
pub const ENV_ENCRYPTION_KEY: &str = "BANK_INGEST_ENCRYPTION_KEY";

/// 配置键
pub mod config_keys {
    pub const TOTAL_JOBS: &str = "ingest.total_jobs";
    pub const RECORDS_PER_JOB: &str = "ingest.records_per_job";
    pub const TIMEOUT_SECS: &str = "ingest.timeout_secs";
    pub const MAX_CONCURRENCY: &str = "ingest.max_concurrency";
    pub const ORDERING: &str = "ingest.ordering";
    pub const CUSTOMERS_FILE: &str = "ingest.customers_file";
    pub const ACCOUNTS_FILE: &str = "ingest.accounts_file";
    pub const NATIONAL_ID_INPUT: &str = "ingest.national_id_input";
    pub const REPORT_MIN_BALANCE: &str = "ingest.report_min_balance";
    pub const ENCRYPTION_KEY: &str = "encryption.key";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_shared_connection(db_path)?;
        Ok(Self { conn })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: SharedConnection) -> ConfigResult<Self> {
        {
            let guard = lock(&conn)?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = lock(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        debug!(key, "配置已写入");
        Ok(())
    }

    /// 加载导入配置（缺省项取默认值）
    pub fn load_ingest_config(&self) -> ConfigResult<IngestConfig> {
        let mut config = IngestConfig::default();

        if let Some(v) = self.parse_value::<usize>(config_keys::TOTAL_JOBS)? {
            config.total_jobs = v;
        }
        if let Some(v) = self.parse_value::<usize>(config_keys::RECORDS_PER_JOB)? {
            config.records_per_job = v;
        }
        if let Some(v) = self.parse_value::<u64>(config_keys::TIMEOUT_SECS)? {
            config.timeout_secs = v;
        }
        if let Some(v) = self.parse_value::<usize>(config_keys::MAX_CONCURRENCY)? {
            config.max_concurrency = Some(v);
        }
        if let Some(v) = self.parse_value(config_keys::ORDERING)? {
            config.ordering = v;
        }
        if let Some(v) = self.get_global_config_value(config_keys::CUSTOMERS_FILE)? {
            config.customers_file = v;
        }
        if let Some(v) = self.get_global_config_value(config_keys::ACCOUNTS_FILE)? {
            config.accounts_file = v;
        }
        if let Some(v) = self.parse_value(config_keys::NATIONAL_ID_INPUT)? {
            config.national_id_input = v;
        }
        if let Some(v) = self.parse_value::<i64>(config_keys::REPORT_MIN_BALANCE)? {
            config.report_min_balance = v;
        }

        info!(
            total_jobs = config.total_jobs,
            records_per_job = config.records_per_job,
            timeout_secs = config.timeout_secs,
            ordering = %config.ordering,
            "导入配置已加载"
        );
        Ok(config)
    }

    /// 身份证号加密密钥（环境变量优先）
    pub fn encryption_key(&self) -> ConfigResult<Option<String>> {
        if let Ok(key) = std::env::var(ENV_ENCRYPTION_KEY) {
            let trimmed = key.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
        self.get_global_config_value(config_keys::ENCRYPTION_KEY)
    }

    /// 按密钥配置构建加解密器；未配置密钥时使用明文直通
    pub fn build_cipher(&self) -> ConfigResult<Arc<dyn NationalIdCipher>> {
        match self.encryption_key()? {
            Some(key) => Ok(Arc::new(AesGcmCipher::from_hex_key(&key)?)),
            None => {
                warn!("未配置加密密钥,身份证号将按明文落库");
                Ok(Arc::new(PlainCipher))
            }
        }
    }

    /// 读取并解析配置值；非法值视为配置错误
    fn parse_value<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }
}

fn lock(conn: &SharedConnection) -> ConfigResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| ConfigError::LockError(e.to_string()))
}

/// 获取默认数据库路径
///
/// 顺序: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = std::path::PathBuf::from("./bank_ingest.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("bank-ingest");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("bank_ingest.db");
        }
    }

    path.to_string_lossy().to_string()
}
