// ==========================================
// 客户账户导入系统 - XML 报表
// ==========================================
// 结构: <customers><customer><customerId>..</customerId>...</customer></customers>
// ==========================================

use crate::report::{ReportError, ReportResult};
use crate::repository::ReportRow;
use serde::Serialize;
use std::io::Write;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Serialize)]
#[serde(rename = "customers")]
struct CustomersDocument<'a> {
    #[serde(rename = "customer")]
    customers: &'a [ReportRow],
}

/// 以嵌套 XML 写出报表行（每行一个 <customer>,每个字段一个子元素）
pub fn write_xml_report<W: Write>(rows: &[ReportRow], writer: &mut W) -> ReportResult<()> {
    let body = quick_xml::se::to_string(&CustomersDocument { customers: rows })
        .map_err(|e| ReportError::Xml(e.to_string()))?;

    writeln!(writer, "{}", XML_DECLARATION)?;
    writer.write_all(body.as_bytes())?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
