// ==========================================
// 客户账户导入系统 - SQLite 持久化实现
// ==========================================
// 职责: 实现 PersistenceSink（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 单连接 + 互斥锁,每次调用独占,不跨调用持锁
// ==========================================

use crate::db::{open_shared_connection, SharedConnection};
use crate::domain::{AccountRecord, CustomerRecord};
use crate::repository::error::{StorageError, StorageResult};
use crate::repository::persistence_sink::{PersistenceSink, ReportRow};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;
use tracing::debug;

const INSERT_CUSTOMER_SQL: &str = r#"
    INSERT INTO customers (
        customerId, customerName, customerSubName, customerAddress,
        customerZipCode, customerNationalId, customerBirthDate
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

const INSERT_ACCOUNT_SQL: &str = r#"
    INSERT INTO accounts (
        accountNumber, accountType, accountCustomerId,
        accountLimit, accountOpenDate, accountBalance
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

const CUSTOMER_EXISTS_SQL: &str = "SELECT 1 FROM customers WHERE customerId = ?1 LIMIT 1";

const REPORT_SQL: &str = r#"
    SELECT c.customerId, c.customerName, c.customerSubName, c.customerAddress,
           c.customerZipCode, c.customerNationalId, c.customerBirthDate,
           a.accountNumber, a.accountBalance
    FROM accounts a
    JOIN customers c ON c.customerId = a.accountCustomerId
    WHERE a.accountBalance > ?1
    ORDER BY a.accountNumber
"#;

// ==========================================
// SqliteSink
// ==========================================
#[derive(Clone)]
pub struct SqliteSink {
    conn: SharedConnection,
}

impl SqliteSink {
    /// 从已有共享连接创建
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 打开数据库文件（建表幂等）
    pub fn open(db_path: &str) -> StorageResult<Self> {
        let conn = open_shared_connection(db_path)
            .map_err(|e| StorageError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::new(conn))
    }

    /// 共享连接句柄（配置读取等复用同一连接）
    pub fn connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }
}

impl PersistenceSink for SqliteSink {
    fn customer_exists(&self, customer_id: i64) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(CUSTOMER_EXISTS_SQL, params![customer_id], |_row| Ok(true))
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    fn insert_customer(&self, customer: &CustomerRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            INSERT_CUSTOMER_SQL,
            params![
                customer.customer_id,
                customer.name,
                customer.surname,
                customer.address,
                customer.zip_code,
                customer.national_id,
                customer.birth_date,
            ],
        )?;
        debug!(customer_id = customer.customer_id, "客户写入成功");
        Ok(())
    }

    fn insert_account(&self, account: &AccountRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            INSERT_ACCOUNT_SQL,
            params![
                account.number,
                account.account_type.code(),
                account.customer_id,
                account.limit,
                account.open_date,
                account.balance,
            ],
        )?;
        debug!(account_number = %account.number, "账户写入成功");
        Ok(())
    }

    fn query_report(&self, min_balance: i64) -> StorageResult<Vec<ReportRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(REPORT_SQL)?;
        let rows = stmt.query_map(params![min_balance], |row| {
            Ok(ReportRow {
                customer_id: row.get(0)?,
                customer_name: row.get(1)?,
                customer_sub_name: row.get(2)?,
                customer_address: row.get(3)?,
                customer_zip_code: row.get(4)?,
                customer_national_id: row.get(5)?,
                customer_birth_date: row.get(6)?,
                account_number: row.get(7)?,
                account_balance: row.get(8)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        debug!(rows = result.len(), "报表查询完成");
        Ok(result)
    }
}
