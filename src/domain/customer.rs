// ==========================================
// 客户账户导入系统 - 客户领域模型
// ==========================================
// 对齐: customers 表
// 生命周期: 分块工作者内逐条构建 → 交给持久化 → 丢弃
// ==========================================

use crate::domain::validation::{validate_customer_birth_date, validate_customer_national_id};
use crate::domain::DomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// CustomerRecord - 已校验客户
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub customer_id: i64,
    pub name: String,
    pub surname: String,
    pub address: String,
    pub zip_code: i64,
    /// 落库形态（可能为密文）
    pub national_id: String,
    pub birth_date: NaiveDate,
}

impl CustomerRecord {
    /// 构建已校验客户
    ///
    /// # 参数
    /// - plain_national_id: 解密后的身份证号,仅用于校验
    /// - stored_national_id: 落库形态
    ///
    /// # 返回
    /// - Err(DomainError): 身份证号或出生日期不合规（正常流程中校验已先行,不应出现）
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customer_id: i64,
        name: String,
        surname: String,
        address: String,
        zip_code: i64,
        plain_national_id: &str,
        stored_national_id: String,
        birth_date: NaiveDate,
    ) -> Result<Self, DomainError> {
        if !validate_customer_national_id(plain_national_id) {
            return Err(DomainError::InvalidNationalId { customer_id });
        }
        if !validate_customer_birth_date(birth_date) {
            return Err(DomainError::BirthDateTooEarly {
                customer_id,
                birth_date,
            });
        }

        Ok(Self {
            customer_id,
            name,
            surname,
            address,
            zip_code,
            national_id: stored_national_id,
            birth_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(national_id: &str, birth: NaiveDate) -> Result<CustomerRecord, DomainError> {
        CustomerRecord::new(
            7,
            "Sara".to_string(),
            "Ahmadi".to_string(),
            "Tehran".to_string(),
            12345,
            national_id,
            format!("enc:{}", national_id),
            birth,
        )
    }

    #[test]
    fn test_new_valid_customer_keeps_stored_form() {
        let customer = build("0440888451", NaiveDate::from_ymd_opt(2001, 3, 4).unwrap()).unwrap();
        assert_eq!(customer.national_id, "enc:0440888451");
        assert_eq!(customer.customer_id, 7);
    }

    #[test]
    fn test_new_rejects_bad_national_id() {
        let err = build("1234", NaiveDate::from_ymd_opt(2001, 3, 4).unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidNationalId { customer_id: 7 }));
    }

    #[test]
    fn test_new_rejects_old_birth_date() {
        let err = build("0440888451", NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::BirthDateTooEarly { .. }));
    }
}
