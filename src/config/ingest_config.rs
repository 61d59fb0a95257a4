// ==========================================
// 客户账户导入系统 - 导入运行配置
// ==========================================
// 默认值与历史行为一致: 2 个分块 × 每块 5 条,截止 60 秒
// ==========================================

use crate::domain::REPORT_MIN_BALANCE;
use crate::engine::SchedulerSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ==========================================
// 客户/账户管线的先后关系
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOrdering {
    /// 客户导入全部结束后再开始账户导入
    #[default]
    CustomersFirst,
    /// 两条管线同时执行；客户未提交的账户被拒绝,不重试
    Concurrent,
}

impl fmt::Display for AccountOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountOrdering::CustomersFirst => write!(f, "customers_first"),
            AccountOrdering::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl FromStr for AccountOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customers_first" => Ok(AccountOrdering::CustomersFirst),
            "concurrent" => Ok(AccountOrdering::Concurrent),
            other => Err(format!("未知的导入顺序: {}", other)),
        }
    }
}

// ==========================================
// 文件中身份证号的形态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NationalIdInput {
    /// 明文: 校验后加密落库
    #[default]
    Plain,
    /// 密文: 解密后校验,按原密文落库
    Encrypted,
}

impl FromStr for NationalIdInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" => Ok(NationalIdInput::Plain),
            "encrypted" => Ok(NationalIdInput::Encrypted),
            other => Err(format!("未知的身份证号形态: {}", other)),
        }
    }
}

// ==========================================
// IngestConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub total_jobs: usize,
    pub records_per_job: usize,
    pub timeout_secs: u64,
    /// None 表示每个分块一个并发槽位
    pub max_concurrency: Option<usize>,
    pub ordering: AccountOrdering,
    pub customers_file: String,
    pub accounts_file: String,
    pub national_id_input: NationalIdInput,
    pub report_min_balance: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            total_jobs: 2,
            records_per_job: 5,
            timeout_secs: 60,
            max_concurrency: None,
            ordering: AccountOrdering::CustomersFirst,
            customers_file: "customers.csv".to_string(),
            accounts_file: "accounts.csv".to_string(),
            national_id_input: NationalIdInput::Plain,
            report_min_balance: REPORT_MIN_BALANCE,
        }
    }
}

impl IngestConfig {
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            total_jobs: self.total_jobs,
            records_per_job: self.records_per_job,
            timeout: Duration::from_secs(self.timeout_secs),
            max_concurrency: self.max_concurrency,
        }
    }
}
