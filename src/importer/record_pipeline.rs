// ==========================================
// 客户账户导入系统 - 单条记录处理管线
// ==========================================
// 职责: 字段映射 → 按声明顺序校验 → 构建领域对象 → 单条落库
// 顺序: 格式/模式校验 → 存在性校验 → 数值范围校验（首个失败即拒绝）
// 红线: 拒绝是返回值,不是错误；落库失败记为 PersistFailed 并继续
// ==========================================

use crate::config::NationalIdInput;
use crate::domain::validation::{
    validate_account_balance, validate_account_number, validate_account_type,
    validate_customer_birth_date, validate_customer_national_id,
};
use crate::domain::{
    AccountRecord, AccountType, CustomerRecord, RecordOutcome, RejectionReason, ACCOUNT_LIMIT,
};
use crate::encryption::NationalIdCipher;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{account_columns, customer_columns, FieldReader};
use crate::importer::file_parser::RawRecord;
use crate::repository::PersistenceSink;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 管线类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Customers,
    Accounts,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Customers => write!(f, "customers"),
            PipelineKind::Accounts => write!(f, "accounts"),
        }
    }
}

// ==========================================
// RecordPipeline Trait
// ==========================================
// 实现者: CustomerPipeline, AccountPipeline
pub trait RecordPipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// 处理一条记录
    ///
    /// # 参数
    /// - index: 记录在源中的序号（1 起始）
    ///
    /// # 返回
    /// - Ok(RecordOutcome): 终态（Rejected / Persisted / PersistFailed）
    /// - Err(ImportError::DomainConstruction): 校验通过但对象构建失败（分块级致命）
    fn process_record(
        &self,
        index: usize,
        record: &RawRecord,
        sink: &dyn PersistenceSink,
    ) -> ImportResult<RecordOutcome>;
}

macro_rules! reject_on_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(reason) => return Ok(RecordOutcome::Rejected(reason)),
        }
    };
}

// ==========================================
// CustomerPipeline
// ==========================================
pub struct CustomerPipeline {
    cipher: Arc<dyn NationalIdCipher>,
    national_id_input: NationalIdInput,
}

impl CustomerPipeline {
    pub fn new(cipher: Arc<dyn NationalIdCipher>, national_id_input: NationalIdInput) -> Self {
        Self {
            cipher,
            national_id_input,
        }
    }

    /// 返回 (明文, 落库形态)
    fn resolve_national_id(&self, raw: &str) -> Result<(String, Option<String>), RejectionReason> {
        match self.national_id_input {
            NationalIdInput::Plain => Ok((raw.to_string(), None)),
            NationalIdInput::Encrypted => {
                let plain = self.cipher.decrypt(raw).map_err(|e| {
                    RejectionReason::NationalIdUndecryptable {
                        message: e.to_string(),
                    }
                })?;
                Ok((plain, Some(raw.to_string())))
            }
        }
    }
}

impl RecordPipeline for CustomerPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Customers
    }

    fn process_record(
        &self,
        index: usize,
        record: &RawRecord,
        sink: &dyn PersistenceSink,
    ) -> ImportResult<RecordOutcome> {
        let reader = FieldReader::new(record);

        let customer_id = reject_on_err!(reader.int(customer_columns::ID));
        let name = reject_on_err!(reader.text(customer_columns::NAME)).to_string();
        let surname = reject_on_err!(reader.text(customer_columns::SURNAME)).to_string();
        let address = reject_on_err!(reader.text(customer_columns::ADDRESS)).to_string();
        let zip_code = reject_on_err!(reader.int(customer_columns::ZIP_CODE));
        let raw_national_id = reject_on_err!(reader.text(customer_columns::NATIONAL_ID));
        let birth_date = reject_on_err!(reader.date(customer_columns::BIRTH_DATE));

        let (plain_national_id, stored) =
            reject_on_err!(self.resolve_national_id(raw_national_id));
        if !validate_customer_national_id(&plain_national_id) {
            return Ok(RecordOutcome::Rejected(RejectionReason::InvalidNationalId));
        }
        if !validate_customer_birth_date(birth_date) {
            return Ok(RecordOutcome::Rejected(RejectionReason::BirthDateTooEarly {
                year: birth_date.year(),
            }));
        }

        let stored_national_id = match stored {
            Some(s) => s,
            None => match self.cipher.encrypt(&plain_national_id) {
                Ok(s) => s,
                Err(e) => {
                    warn!(row = index, customer_id, error = %e, "身份证号加密失败");
                    return Ok(RecordOutcome::PersistFailed(e.to_string()));
                }
            },
        };

        let customer = CustomerRecord::new(
            customer_id,
            name,
            surname,
            address,
            zip_code,
            &plain_national_id,
            stored_national_id,
            birth_date,
        )?;

        match sink.insert_customer(&customer) {
            Ok(()) => {
                debug!(row = index, customer_id, "客户已落库");
                Ok(RecordOutcome::Persisted)
            }
            Err(e) => {
                warn!(row = index, customer_id, error = %e, "客户落库失败");
                Ok(RecordOutcome::PersistFailed(e.to_string()))
            }
        }
    }
}

// ==========================================
// AccountPipeline
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountPipeline;

impl AccountPipeline {
    pub fn new() -> Self {
        Self
    }
}

impl RecordPipeline for AccountPipeline {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Accounts
    }

    fn process_record(
        &self,
        index: usize,
        record: &RawRecord,
        sink: &dyn PersistenceSink,
    ) -> ImportResult<RecordOutcome> {
        let reader = FieldReader::new(record);

        // 1. 格式/模式
        let number = reject_on_err!(reader.text(account_columns::NUMBER)).to_string();
        if !validate_account_number(&number) {
            return Ok(RecordOutcome::Rejected(RejectionReason::InvalidAccountNumber));
        }

        let type_token = reject_on_err!(reader.text(account_columns::TYPE));
        if !validate_account_type(type_token) {
            return Ok(RecordOutcome::Rejected(RejectionReason::InvalidAccountType {
                token: type_token.to_string(),
            }));
        }
        let account_type: AccountType = type_token.parse().map_err(ImportError::InternalError)?;

        // 2. 存在性（读取已提交的客户）
        let customer_id = reject_on_err!(reader.int(account_columns::CUSTOMER_ID));
        match sink.customer_exists(customer_id) {
            Ok(true) => {}
            Ok(false) => {
                return Ok(RecordOutcome::Rejected(RejectionReason::UnknownCustomer {
                    customer_id,
                }))
            }
            Err(e) => {
                warn!(row = index, customer_id, error = %e, "客户存在性查询失败");
                return Ok(RecordOutcome::Rejected(
                    RejectionReason::CustomerLookupFailed {
                        message: e.to_string(),
                    },
                ));
            }
        }

        // 3. 数值范围
        // 文件未给出限额时使用固定限额
        let file_limit = reject_on_err!(reader.optional_int(account_columns::LIMIT));
        let limit = file_limit.unwrap_or(ACCOUNT_LIMIT);
        let balance = reject_on_err!(reader.int(account_columns::BALANCE));
        if !validate_account_balance(limit, balance) {
            return Ok(RecordOutcome::Rejected(
                RejectionReason::BalanceExceedsLimit { balance, limit },
            ));
        }

        let open_date = reject_on_err!(reader.date(account_columns::OPEN_DATE));

        let account = match file_limit {
            Some(limit) => AccountRecord::with_limit(
                number,
                account_type,
                customer_id,
                limit,
                open_date,
                balance,
            )?,
            None => AccountRecord::new(number, account_type, customer_id, open_date, balance)?,
        };

        match sink.insert_account(&account) {
            Ok(()) => {
                debug!(row = index, account_number = %account.number, "账户已落库");
                Ok(RecordOutcome::Persisted)
            }
            Err(e) => {
                warn!(row = index, account_number = %account.number, error = %e, "账户落库失败");
                Ok(RecordOutcome::PersistFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{AesGcmCipher, PlainCipher};
    use crate::repository::{ReportRow, StorageError, StorageResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        customers: Mutex<Vec<CustomerRecord>>,
        accounts: Mutex<Vec<AccountRecord>>,
        fail_lookup: bool,
    }

    impl PersistenceSink for MemorySink {
        fn customer_exists(&self, customer_id: i64) -> StorageResult<bool> {
            if self.fail_lookup {
                return Err(StorageError::DatabaseQueryError("locked".to_string()));
            }
            Ok(self
                .customers
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.customer_id == customer_id))
        }

        fn insert_customer(&self, customer: &CustomerRecord) -> StorageResult<()> {
            self.customers.lock().unwrap().push(customer.clone());
            Ok(())
        }

        fn insert_account(&self, account: &AccountRecord) -> StorageResult<()> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|a| a.number == account.number) {
                return Err(StorageError::UniqueConstraintViolation(account.number.clone()));
            }
            accounts.push(account.clone());
            Ok(())
        }

        fn query_report(&self, _min_balance: i64) -> StorageResult<Vec<ReportRow>> {
            Ok(Vec::new())
        }
    }

    const CUSTOMER_HEADERS: [&str; 8] = [
        "row",
        "customerId",
        "customerName",
        "customerSubName",
        "customerAddress",
        "customerZipCode",
        "customerNationalId",
        "customerBirthDate",
    ];

    const ACCOUNT_HEADERS: [&str; 7] = [
        "row",
        "accountNumber",
        "accountType",
        "accountCustomerId",
        "accountLimit",
        "accountOpenDate",
        "accountBalance",
    ];

    fn raw(headers: &[&str], values: &[&str]) -> RawRecord {
        RawRecord::new(
            Arc::new(headers.iter().map(|s| s.to_string()).collect()),
            values.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn customer_row(id: &str, national_id: &str, birth: &str) -> RawRecord {
        raw(
            &CUSTOMER_HEADERS,
            &["1", id, "Sara", "Ahmadi", "Tehran", "12345", national_id, birth],
        )
    }

    fn account_row(number: &str, kind: &str, customer: &str, balance: &str) -> RawRecord {
        account_row_with_limit(number, kind, customer, "", balance)
    }

    fn account_row_with_limit(
        number: &str,
        kind: &str,
        customer: &str,
        limit: &str,
        balance: &str,
    ) -> RawRecord {
        raw(
            &ACCOUNT_HEADERS,
            &["1", number, kind, customer, limit, "2020-05-01", balance],
        )
    }

    fn plain_pipeline() -> CustomerPipeline {
        CustomerPipeline::new(Arc::new(PlainCipher), NationalIdInput::Plain)
    }

    #[test]
    fn test_customer_persisted() {
        let sink = MemorySink::default();
        let outcome = plain_pipeline()
            .process_record(1, &customer_row("7", "0440888451", "2000-01-01"), &sink)
            .unwrap();

        assert_eq!(outcome, RecordOutcome::Persisted);
        assert_eq!(sink.customers.lock().unwrap()[0].national_id, "0440888451");
    }

    #[test]
    fn test_customer_rejections() {
        let sink = MemorySink::default();
        let pipeline = plain_pipeline();

        let bad_id = pipeline
            .process_record(1, &customer_row("7", "1234", "2000-01-01"), &sink)
            .unwrap();
        assert_eq!(
            bad_id,
            RecordOutcome::Rejected(RejectionReason::InvalidNationalId)
        );

        let too_old = pipeline
            .process_record(2, &customer_row("8", "0440888451", "1995-12-31"), &sink)
            .unwrap();
        assert_eq!(
            too_old,
            RecordOutcome::Rejected(RejectionReason::BirthDateTooEarly { year: 1995 })
        );

        let bad_date = pipeline
            .process_record(3, &customer_row("9", "0440888451", "not-a-date"), &sink)
            .unwrap();
        assert!(matches!(
            bad_date,
            RecordOutcome::Rejected(RejectionReason::MalformedField { .. })
        ));

        assert!(sink.customers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_customer_encrypted_input() {
        let cipher = Arc::new(AesGcmCipher::from_hex_key(&AesGcmCipher::generate_hex_key()).unwrap());
        let stored = cipher.encrypt("0440888451").unwrap();
        let pipeline = CustomerPipeline::new(cipher.clone(), NationalIdInput::Encrypted);
        let sink = MemorySink::default();

        let ok = pipeline
            .process_record(1, &customer_row("7", &stored, "2001-02-03"), &sink)
            .unwrap();
        assert_eq!(ok, RecordOutcome::Persisted);
        assert_eq!(sink.customers.lock().unwrap()[0].national_id, stored);

        let garbage = pipeline
            .process_record(2, &customer_row("8", "zz", "2001-02-03"), &sink)
            .unwrap();
        assert!(matches!(
            garbage,
            RecordOutcome::Rejected(RejectionReason::NationalIdUndecryptable { .. })
        ));
    }

    #[test]
    fn test_account_validation_order() {
        let sink = MemorySink::default();
        let pipeline = AccountPipeline::new();

        // 账号与类型先于存在性
        let outcome = pipeline
            .process_record(1, &account_row("123", "SAVINGS", "7", "100"), &sink)
            .unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Rejected(RejectionReason::InvalidAccountNumber)
        );

        let outcome = pipeline
            .process_record(
                2,
                &account_row("0440888451237986539873", "CHECKING", "7", "100"),
                &sink,
            )
            .unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Rejected(RejectionReason::InvalidAccountType {
                token: "CHECKING".to_string()
            })
        );

        // 存在性先于余额
        let outcome = pipeline
            .process_record(
                3,
                &account_row("0440888451237986539873", "SAVINGS", "7", "99999"),
                &sink,
            )
            .unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Rejected(RejectionReason::UnknownCustomer { customer_id: 7 })
        );
    }

    #[test]
    fn test_account_persisted_and_limit_checked() {
        let sink = MemorySink::default();
        plain_pipeline()
            .process_record(1, &customer_row("7", "0440888451", "2000-01-01"), &sink)
            .unwrap();
        let pipeline = AccountPipeline::new();

        let over = pipeline
            .process_record(
                1,
                &account_row("0440888451237986539873", "SAVINGS", "7", "10001"),
                &sink,
            )
            .unwrap();
        assert_eq!(
            over,
            RecordOutcome::Rejected(RejectionReason::BalanceExceedsLimit {
                balance: 10001,
                limit: ACCOUNT_LIMIT
            })
        );

        let ok = pipeline
            .process_record(
                2,
                &account_row("0440888451237986539873", "2", "7", "10000"),
                &sink,
            )
            .unwrap();
        assert_eq!(ok, RecordOutcome::Persisted);
        assert_eq!(
            sink.accounts.lock().unwrap()[0].account_type,
            AccountType::RecurringDeposit
        );

        // 重复账号: 落库失败但不是错误
        let dup = pipeline
            .process_record(
                3,
                &account_row("0440888451237986539873", "2", "7", "10"),
                &sink,
            )
            .unwrap();
        assert!(matches!(dup, RecordOutcome::PersistFailed(_)));
    }

    #[test]
    fn test_account_limit_from_file_or_default() {
        let sink = MemorySink::default();
        plain_pipeline()
            .process_record(1, &customer_row("7", "0440888451", "2000-01-01"), &sink)
            .unwrap();
        let pipeline = AccountPipeline::new();

        let over_file_limit = pipeline
            .process_record(
                1,
                &account_row_with_limit("0440888451237986539871", "SAVINGS", "7", "500", "501"),
                &sink,
            )
            .unwrap();
        assert_eq!(
            over_file_limit,
            RecordOutcome::Rejected(RejectionReason::BalanceExceedsLimit {
                balance: 501,
                limit: 500
            })
        );

        let with_file_limit = pipeline
            .process_record(
                2,
                &account_row_with_limit("0440888451237986539872", "SAVINGS", "7", "500", "500"),
                &sink,
            )
            .unwrap();
        assert_eq!(with_file_limit, RecordOutcome::Persisted);

        let blank_limit = pipeline
            .process_record(
                3,
                &account_row("0440888451237986539873", "FIXED_DEPOSIT", "7", "9000"),
                &sink,
            )
            .unwrap();
        assert_eq!(blank_limit, RecordOutcome::Persisted);

        let accounts = sink.accounts.lock().unwrap();
        assert_eq!(accounts[0].limit, 500);
        assert_eq!(accounts[1].limit, ACCOUNT_LIMIT);
        assert_eq!(accounts[1].account_type, AccountType::FixedDeposit);
    }

    #[test]
    fn test_account_lookup_failure_is_rejection() {
        let sink = MemorySink {
            fail_lookup: true,
            ..Default::default()
        };
        let outcome = AccountPipeline::new()
            .process_record(
                1,
                &account_row("0440888451237986539873", "SAVINGS", "7", "10"),
                &sink,
            )
            .unwrap();
        assert!(matches!(
            outcome,
            RecordOutcome::Rejected(RejectionReason::CustomerLookupFailed { .. })
        ));
    }
}
