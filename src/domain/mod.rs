// ==========================================
// 客户账户导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、字段校验规则
// 红线: 不含数据访问逻辑,不含调度逻辑
// ==========================================

pub mod account;
pub mod customer;
pub mod types;
pub mod validation;

use chrono::NaiveDate;
use thiserror::Error;

// 重导出核心类型
pub use account::{AccountRecord, REPORT_MIN_BALANCE};
pub use customer::CustomerRecord;
pub use types::{AccountType, ChunkSummary, RecordOutcome, RecordRange, RejectionReason};
pub use validation::ACCOUNT_LIMIT;

/// 领域对象构建错误
///
/// 以不合规数据构建已校验对象时产生；校验先行时不应出现
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("身份证号非法 (customerId={customer_id})")]
    InvalidNationalId { customer_id: i64 },

    #[error("出生日期非法 (customerId={customer_id}): {birth_date}")]
    BirthDateTooEarly {
        customer_id: i64,
        birth_date: NaiveDate,
    },

    #[error("账号非法: {number}")]
    InvalidAccountNumber { number: String },

    #[error("余额超限 (账号 {number}): {balance} > {limit}")]
    BalanceExceedsLimit {
        number: String,
        balance: i64,
        limit: i64,
    },
}
