// ==========================================
// 客户账户导入系统 - 领域类型定义
// ==========================================
// 职责: 账户类型、记录区间、拒绝原因、分块汇总
// 红线: 纯值类型,不含 I/O
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 账户类型 (Account Type)
// ==========================================
// 存储编码沿用历史口径: 1/2/3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,          // 活期储蓄
    RecurringDeposit, // 零存整取
    FixedDeposit,     // 定期存款
}

impl AccountType {
    /// 全部合法变体（声明顺序）
    pub const ALL: [AccountType; 3] = [
        AccountType::Savings,
        AccountType::RecurringDeposit,
        AccountType::FixedDeposit,
    ];

    /// 数据库存储编码
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Savings => "1",
            AccountType::RecurringDeposit => "2",
            AccountType::FixedDeposit => "3",
        }
    }

    /// 从存储编码还原
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code.trim())
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Savings => write!(f, "SAVINGS"),
            AccountType::RecurringDeposit => write!(f, "RECURRING_DEPOSIT"),
            AccountType::FixedDeposit => write!(f, "FIXED_DEPOSIT"),
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    /// 接受变体名（含历史写法,不区分大小写）或存储编码
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_uppercase();
        match token.as_str() {
            "SAVINGS" | "1" => Ok(AccountType::Savings),
            "RECURRING_DEPOSIT" | "RECURRINGDEPOSIT" | "2" => Ok(AccountType::RecurringDeposit),
            "FIXED_DEPOSIT" | "FIXEDDEPOSITACCOUNT" | "3" => Ok(AccountType::FixedDeposit),
            _ => Err(format!("未知账户类型: {}", s.trim())),
        }
    }
}

// ==========================================
// RecordRange - 记录区间
// ==========================================
// 1 起始、闭区间、start <= end
// 由调度器在分区时创建,仅被一个分块任务消费
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRange {
    start: usize,
    end: usize,
}

impl RecordRange {
    /// 创建区间；start 为 0 或 start > end 时返回 None
    pub fn new(start: usize, end: usize) -> Option<Self> {
        if start == 0 || start > end {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// 区间内记录数
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// 闭区间恒非空
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }
}

impl fmt::Display for RecordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ==========================================
// RejectionReason - 校验拒绝原因
// ==========================================
// 预期内的逐条拒绝,不作为错误向上传播
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// 字段缺失或无法解析（上游数据格式问题）
    MalformedField { field: String, message: String },
    InvalidAccountNumber,
    InvalidAccountType { token: String },
    UnknownCustomer { customer_id: i64 },
    /// 客户存在性查询本身失败
    CustomerLookupFailed { message: String },
    BalanceExceedsLimit { balance: i64, limit: i64 },
    NationalIdUndecryptable { message: String },
    InvalidNationalId,
    BirthDateTooEarly { year: i32 },
}

impl RejectionReason {
    /// 拒绝原因的稳定标识（日志/统计用）
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::MalformedField { .. } => "MALFORMED_FIELD",
            RejectionReason::InvalidAccountNumber => "INVALID_ACCOUNT_NUMBER",
            RejectionReason::InvalidAccountType { .. } => "INVALID_ACCOUNT_TYPE",
            RejectionReason::UnknownCustomer { .. } => "UNKNOWN_CUSTOMER",
            RejectionReason::CustomerLookupFailed { .. } => "CUSTOMER_LOOKUP_FAILED",
            RejectionReason::BalanceExceedsLimit { .. } => "BALANCE_EXCEEDS_LIMIT",
            RejectionReason::NationalIdUndecryptable { .. } => "NATIONAL_ID_UNDECRYPTABLE",
            RejectionReason::InvalidNationalId => "INVALID_NATIONAL_ID",
            RejectionReason::BirthDateTooEarly { .. } => "BIRTH_DATE_TOO_EARLY",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MalformedField { field, message } => {
                write!(f, "字段 {} 格式错误: {}", field, message)
            }
            RejectionReason::InvalidAccountNumber => write!(f, "账号格式非法"),
            RejectionReason::InvalidAccountType { token } => write!(f, "账户类型非法: {}", token),
            RejectionReason::UnknownCustomer { customer_id } => {
                write!(f, "客户不存在: customerId={}", customer_id)
            }
            RejectionReason::CustomerLookupFailed { message } => {
                write!(f, "客户存在性查询失败: {}", message)
            }
            RejectionReason::BalanceExceedsLimit { balance, limit } => {
                write!(f, "余额 {} 超过限额 {}", balance, limit)
            }
            RejectionReason::NationalIdUndecryptable { message } => {
                write!(f, "身份证号无法解密: {}", message)
            }
            RejectionReason::InvalidNationalId => write!(f, "身份证号格式非法"),
            RejectionReason::BirthDateTooEarly { year } => {
                write!(f, "出生年份 {} 不晚于 1995", year)
            }
        }
    }
}

// ==========================================
// RecordOutcome - 单条记录终态
// ==========================================
// 状态机: Unvalidated -> {Rejected | Validated} -> {Persisted | PersistFailed}
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Rejected(RejectionReason),
    Persisted,
    PersistFailed(String),
}

// ==========================================
// ChunkSummary - 分块执行汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub records_processed: usize,
    /// 通过全部校验的记录（含落库失败）
    pub records_valid: usize,
    pub records_rejected: usize,
    pub records_persisted: usize,
    pub records_persist_failed: usize,
    /// 是否因取消而提前停止
    pub cancelled: bool,
    /// 导致分块提前终止的错误（数据源不可读等）
    pub error: Option<String>,
}

impl ChunkSummary {
    /// 计入一条记录的终态
    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.records_processed += 1;
        match outcome {
            RecordOutcome::Rejected(_) => self.records_rejected += 1,
            RecordOutcome::Persisted => {
                self.records_valid += 1;
                self.records_persisted += 1;
            }
            RecordOutcome::PersistFailed(_) => {
                self.records_valid += 1;
                self.records_persist_failed += 1;
            }
        }
    }

    /// 合并另一个汇总（聚合用,error 保留首个）
    pub fn absorb(&mut self, other: &ChunkSummary) {
        self.records_processed += other.records_processed;
        self.records_valid += other.records_valid;
        self.records_rejected += other.records_rejected;
        self.records_persisted += other.records_persisted;
        self.records_persist_failed += other.records_persist_failed;
        self.cancelled |= other.cancelled;
        if self.error.is_none() {
            self.error = other.error.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_tokens() {
        assert_eq!("SAVINGS".parse::<AccountType>(), Ok(AccountType::Savings));
        assert_eq!(
            "recurringdeposit".parse::<AccountType>(),
            Ok(AccountType::RecurringDeposit)
        );
        assert_eq!(
            "FIXEDDEPOSITACCOUNT".parse::<AccountType>(),
            Ok(AccountType::FixedDeposit)
        );
        assert_eq!("3".parse::<AccountType>(), Ok(AccountType::FixedDeposit));
        assert!("CHECKING".parse::<AccountType>().is_err());
        assert!("".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_account_type_code_roundtrip() {
        for t in AccountType::ALL {
            assert_eq!(AccountType::from_code(t.code()), Some(t));
        }
        assert_eq!(AccountType::from_code("9"), None);
    }

    #[test]
    fn test_record_range_bounds() {
        assert!(RecordRange::new(0, 5).is_none());
        assert!(RecordRange::new(6, 5).is_none());

        let range = RecordRange::new(6, 10).unwrap();
        assert_eq!(range.len(), 5);
        assert!(!range.contains(5));
        assert!(range.contains(6));
        assert!(range.contains(10));
        assert!(!range.contains(11));
        assert_eq!(range.to_string(), "[6, 10]");
    }

    #[test]
    fn test_chunk_summary_counts() {
        let mut summary = ChunkSummary::default();
        summary.record(&RecordOutcome::Persisted);
        summary.record(&RecordOutcome::PersistFailed("locked".to_string()));
        summary.record(&RecordOutcome::Rejected(RejectionReason::InvalidAccountNumber));

        assert_eq!(summary.records_processed, 3);
        assert_eq!(summary.records_valid, 2);
        assert_eq!(summary.records_rejected, 1);
        assert_eq!(summary.records_persisted, 1);
        assert_eq!(summary.records_persist_failed, 1);
    }
}
