// ==========================================
// 客户账户导入系统 - 账户领域模型
// ==========================================
// 对齐: accounts 表
// 依赖: accountCustomerId 必须已存在于 customers
// ==========================================

use crate::domain::types::AccountType;
use crate::domain::validation::{validate_account_balance, validate_account_number, ACCOUNT_LIMIT};
use crate::domain::DomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 报表口径: 余额大于该值的账户进入报表
pub const REPORT_MIN_BALANCE: i64 = 1_000;

// ==========================================
// AccountRecord - 已校验账户
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub number: String,
    pub account_type: AccountType,
    pub customer_id: i64,
    pub limit: i64,
    pub open_date: NaiveDate,
    pub balance: i64,
}

impl AccountRecord {
    /// 以固定限额 ACCOUNT_LIMIT 构建
    pub fn new(
        number: String,
        account_type: AccountType,
        customer_id: i64,
        open_date: NaiveDate,
        balance: i64,
    ) -> Result<Self, DomainError> {
        Self::with_limit(number, account_type, customer_id, ACCOUNT_LIMIT, open_date, balance)
    }

    /// 以文件携带的限额构建
    pub fn with_limit(
        number: String,
        account_type: AccountType,
        customer_id: i64,
        limit: i64,
        open_date: NaiveDate,
        balance: i64,
    ) -> Result<Self, DomainError> {
        if !validate_account_number(&number) {
            return Err(DomainError::InvalidAccountNumber { number });
        }
        if !validate_account_balance(limit, balance) {
            return Err(DomainError::BalanceExceedsLimit { number, balance, limit });
        }

        Ok(Self {
            number,
            account_type,
            customer_id,
            limit,
            open_date,
            balance,
        })
    }

    /// 是否满足报表口径（balance > 1000）
    pub fn is_reportable(&self) -> bool {
        self.balance > REPORT_MIN_BALANCE
    }
}
