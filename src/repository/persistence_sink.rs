// ==========================================
// 客户账户导入系统 - 持久化接口
// ==========================================
// 职责: 定义分块工作者与报表使用的数据访问接口（不包含实现）
// 约束: 单条参数化插入；去重/幂等策略由实现方负责
// ==========================================

use crate::domain::{AccountRecord, CustomerRecord};
use crate::repository::error::StorageResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ReportRow - 报表行（账户关联其所属客户）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_sub_name: String,
    pub customer_address: String,
    pub customer_zip_code: i64,
    pub customer_national_id: String,
    pub customer_birth_date: NaiveDate,
    pub account_number: String,
    pub account_balance: i64,
}

// ==========================================
// PersistenceSink Trait
// ==========================================
// 实现者: SqliteSink
// 并发: 所有分块共享同一实现实例,实现方自行保证线程安全
pub trait PersistenceSink: Send + Sync {
    /// 客户是否已提交（读取已提交状态）
    fn customer_exists(&self, customer_id: i64) -> StorageResult<bool>;

    /// 插入单个客户
    fn insert_customer(&self, customer: &CustomerRecord) -> StorageResult<()>;

    /// 插入单个账户
    fn insert_account(&self, account: &AccountRecord) -> StorageResult<()>;

    /// 报表查询: 余额大于 min_balance 的账户关联其客户
    ///
    /// # 返回
    /// - 只读结果集,按 accountNumber 排序
    fn query_report(&self, min_balance: i64) -> StorageResult<Vec<ReportRow>>;
}
