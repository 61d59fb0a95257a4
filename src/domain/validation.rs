// ==========================================
// 客户账户导入系统 - 字段校验规则
// ==========================================
// 职责: 单字段业务规则（纯函数,无副作用）
// 红线: 输入已完成类型转换；解析失败由调用方（分块工作者）处理
// ==========================================

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// 账户余额上限（固定常量）
pub const ACCOUNT_LIMIT: i64 = 10_000;

/// 出生年份下限（不含）
pub const MIN_BIRTH_YEAR_EXCLUSIVE: i32 = 1995;

fn account_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0[0-9]{21}$").expect("账号正则非法"))
}

fn national_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("身份证号正则非法"))
}

/// 账号: 22 位,首位 '0',其余均为数字
pub fn validate_account_number(account_number: &str) -> bool {
    account_number_pattern().is_match(account_number)
}

/// 账户类型令牌: 必须能解析为声明的三种类型之一
pub fn validate_account_type(token: &str) -> bool {
    token.parse::<crate::domain::AccountType>().is_ok()
}

/// 余额不得超过限额
pub fn validate_account_balance(account_limit: i64, account_balance: i64) -> bool {
    account_balance <= account_limit
}

/// 身份证号（解密后）: 恰好 10 位数字
pub fn validate_customer_national_id(national_id: &str) -> bool {
    national_id_pattern().is_match(national_id)
}

/// 出生日期: 年份晚于 1995
pub fn validate_customer_birth_date(birth_date: NaiveDate) -> bool {
    birth_date.year() > MIN_BIRTH_YEAR_EXCLUSIVE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number() {
        assert!(validate_account_number("0440888451237986539873"));
        assert!(!validate_account_number("1440888451237986539873"));
        assert!(!validate_account_number("044088845123798653987"));
        assert!(!validate_account_number("04408884512379865398731"));
        assert!(!validate_account_number("04408884512379865398a3"));
        assert!(!validate_account_number(""));
    }

    #[test]
    fn test_account_number_rejects_non_ascii_digits() {
        // 只接受 ASCII 数字
        assert!(!validate_account_number("0４40888451237986539873"));
    }

    #[test]
    fn test_account_type() {
        assert!(validate_account_type("SAVINGS"));
        assert!(validate_account_type("FIXED_DEPOSIT"));
        assert!(!validate_account_type("GOLD"));
    }

    #[test]
    fn test_account_balance() {
        assert!(validate_account_balance(1000, 200));
        assert!(validate_account_balance(1000, 1000));
        assert!(!validate_account_balance(1000, 1200));
    }

    #[test]
    fn test_national_id() {
        assert!(validate_customer_national_id("0440888451"));
        assert!(!validate_customer_national_id("1234"));
        assert!(!validate_customer_national_id("04408884510"));
        assert!(!validate_customer_national_id("044088845x"));
    }

    #[test]
    fn test_birth_date() {
        assert!(validate_customer_birth_date(
            NaiveDate::from_ymd_opt(2015, 10, 12).unwrap()
        ));
        assert!(!validate_customer_birth_date(
            NaiveDate::from_ymd_opt(1700, 10, 12).unwrap()
        ));
        assert!(!validate_customer_birth_date(
            NaiveDate::from_ymd_opt(1995, 12, 31).unwrap()
        ));
    }

    #[test]
    fn test_validators_are_repeatable() {
        let date = NaiveDate::from_ymd_opt(1996, 1, 1).unwrap();
        for _ in 0..2 {
            assert!(validate_account_number("0440888451237986539873"));
            assert!(validate_customer_national_id("0440888451"));
            assert!(validate_customer_birth_date(date));
            assert!(!validate_account_balance(10, 11));
        }
    }
}
