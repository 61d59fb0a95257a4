// ==========================================
// 客户账户导入系统 - 报表层
// ==========================================
// 职责: 报表查询结果 → JSON / XML 文件
// 口径: 余额大于阈值的账户,关联其所属客户
// ==========================================

pub mod json_report;
pub mod xml_report;

use crate::repository::{PersistenceSink, StorageError};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub use json_report::write_json_report;
pub use xml_report::write_xml_report;

/// 报表错误
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("报表写入失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML 序列化失败: {0}")]
    Xml(String),

    #[error("报表格式不支持: {0}（仅支持 json/xml）")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result 类型别名
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Xml,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "xml" => Ok(ReportFormat::Xml),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// 查询报表并写入文件
///
/// # 返回
/// - Ok(usize): 写出的行数
pub fn export_report(
    sink: &dyn PersistenceSink,
    min_balance: i64,
    format: ReportFormat,
    path: &Path,
) -> ReportResult<usize> {
    let rows = sink.query_report(min_balance)?;
    let mut writer = BufWriter::new(File::create(path)?);

    match format {
        ReportFormat::Json => write_json_report(&rows, &mut writer)?,
        ReportFormat::Xml => write_xml_report(&rows, &mut writer)?,
    }

    info!(
        path = %path.display(),
        rows = rows.len(),
        min_balance,
        "报表已生成"
    );
    Ok(rows.len())
}
