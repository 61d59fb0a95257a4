// ==========================================
// 客户账户导入系统 - JSON 报表
// ==========================================

use crate::report::ReportResult;
use crate::repository::ReportRow;
use std::io::Write;

/// 以 JSON 数组写出报表行（字段名沿用列名: customerId, customerName, ...）
pub fn write_json_report<W: Write>(rows: &[ReportRow], writer: &mut W) -> ReportResult<()> {
    serde_json::to_writer_pretty(&mut *writer, rows)?;
    writer.flush()?;
    Ok(())
}
