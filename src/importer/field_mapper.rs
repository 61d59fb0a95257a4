// ==========================================
// 客户账户导入系统 - 字段映射器
// ==========================================
// 职责: 原始记录 → 类型化字段（按列名取值,缺表头时回退到列位置）
// 口径: 第 0 列为行标签,业务列从第 1 列开始
// 失败: 字段缺失/无法解析 → RejectionReason::MalformedField（不是错误）
// ==========================================

use crate::domain::RejectionReason;
use crate::importer::file_parser::RawRecord;
use chrono::NaiveDate;

/// 列定义: 标准列名 + 历史列位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub position: usize,
}

impl Column {
    const fn new(name: &'static str, position: usize) -> Self {
        Self { name, position }
    }
}

// ===== 客户文件列 =====
pub mod customer_columns {
    use super::Column;

    pub const ID: Column = Column::new("customerId", 1);
    pub const NAME: Column = Column::new("customerName", 2);
    pub const SURNAME: Column = Column::new("customerSubName", 3);
    pub const ADDRESS: Column = Column::new("customerAddress", 4);
    pub const ZIP_CODE: Column = Column::new("customerZipCode", 5);
    pub const NATIONAL_ID: Column = Column::new("customerNationalId", 6);
    pub const BIRTH_DATE: Column = Column::new("customerBirthDate", 7);
}

// ===== 账户文件列 =====
pub mod account_columns {
    use super::Column;

    pub const NUMBER: Column = Column::new("accountNumber", 1);
    pub const TYPE: Column = Column::new("accountType", 2);
    pub const CUSTOMER_ID: Column = Column::new("accountCustomerId", 3);
    pub const LIMIT: Column = Column::new("accountLimit", 4);
    pub const OPEN_DATE: Column = Column::new("accountOpenDate", 5);
    pub const BALANCE: Column = Column::new("accountBalance", 6);
}

/// 支持的日期格式
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

fn malformed(column: Column, message: impl Into<String>) -> RejectionReason {
    RejectionReason::MalformedField {
        field: column.name.to_string(),
        message: message.into(),
    }
}

// ==========================================
// FieldReader - 单条记录的类型化读取器
// ==========================================
pub struct FieldReader<'a> {
    record: &'a RawRecord,
}

impl<'a> FieldReader<'a> {
    pub fn new(record: &'a RawRecord) -> Self {
        Self { record }
    }

    /// 取原始文本（去首尾空白,空串视为缺失）
    pub fn optional_text(&self, column: Column) -> Option<&'a str> {
        let value = if self.record.has_header(column.name) {
            self.record.get(column.name)
        } else {
            self.record.get_at(column.position)
        };

        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// 必填文本
    pub fn text(&self, column: Column) -> Result<&'a str, RejectionReason> {
        self.optional_text(column)
            .ok_or_else(|| malformed(column, "字段缺失"))
    }

    /// 必填整数
    pub fn int(&self, column: Column) -> Result<i64, RejectionReason> {
        let value = self.text(column)?;
        value
            .parse::<i64>()
            .map_err(|_| malformed(column, format!("无法解析为整数: {}", value)))
    }

    /// 可选整数（缺失时返回 None,存在但非法时拒绝）
    pub fn optional_int(&self, column: Column) -> Result<Option<i64>, RejectionReason> {
        match self.optional_text(column) {
            None => Ok(None),
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| malformed(column, format!("无法解析为整数: {}", value))),
        }
    }

    /// 必填日期（支持 YYYY-MM-DD 与 YYYYMMDD）
    pub fn date(&self, column: Column) -> Result<NaiveDate, RejectionReason> {
        let value = self.text(column)?;
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .ok_or_else(|| malformed(column, format!("日期格式错误: {}", value)))
    }
}
