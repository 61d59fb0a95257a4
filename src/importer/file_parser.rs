// ==========================================
// 客户账户导入系统 - 记录源实现
// ==========================================
// 职责: 打开命名输入,产出有序、惰性的原始记录流
// 支持: CSV (.csv) / Excel (.xlsx/.xls)
// 约束: 不可按下标定位；每个分块独立打开、顺序扫描
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ==========================================
// RawRecord - 原始记录
// ==========================================
// 支持按列名与按位置两种访问方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    headers: Arc<Vec<String>>,
    values: Vec<String>,
}

impl RawRecord {
    pub fn new(headers: Arc<Vec<String>>, values: Vec<String>) -> Self {
        Self { headers, values }
    }

    /// 按列名取值（不区分大小写）
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .and_then(|idx| self.get_at(idx))
    }

    /// 按位置取值（0 起始）
    pub fn get_at(&self, position: usize) -> Option<&str> {
        self.values.get(position).map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 惰性记录流
pub type RecordStream = Box<dyn Iterator<Item = ImportResult<RawRecord>> + Send>;

// ==========================================
// RecordSource Trait
// ==========================================
// 实现者: CsvRecordSource, ExcelRecordSource
pub trait RecordSource: Send + Sync {
    /// 输入名称（日志用）
    fn name(&self) -> &str;

    /// 打开一个独立的读句柄
    ///
    /// # 返回
    /// - Ok(RecordStream): 按源顺序产出记录（首行为表头,不计入）
    /// - Err: 文件不存在、格式不支持、读取失败
    fn open(&self) -> ImportResult<RecordStream>;
}

fn check_file(path: &Path, allowed: &[&str]) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !allowed.contains(&ext.as_str()) {
        return Err(ImportError::UnsupportedFormat(ext));
    }
    Ok(())
}

// ==========================================
// CSV 记录源
// ==========================================
pub struct CsvRecordSource {
    path: PathBuf,
    name: String,
}

impl CsvRecordSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl RecordSource for CsvRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> ImportResult<RecordStream> {
        check_file(&self.path, &["csv"])?;

        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(Trim::All)
            .from_reader(file);

        let headers: Arc<Vec<String>> = Arc::new(
            reader
                .headers()?
                .iter()
                .map(|h| h.trim().to_string())
                .collect(),
        );

        let stream = reader.into_records().map(move |result| {
            let record = result?;
            Ok(RawRecord::new(
                headers.clone(),
                record.iter().map(str::to_string).collect(),
            ))
        });

        Ok(Box::new(stream))
    }
}

// ==========================================
// Excel 记录源（读取第一个工作表）
// ==========================================
pub struct ExcelRecordSource {
    path: PathBuf,
    name: String,
}

impl ExcelRecordSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl RecordSource for ExcelRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> ImportResult<RecordStream> {
        check_file(&self.path, &["xlsx", "xls"])?;

        let mut workbook = open_workbook_auto(&self.path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无表头".to_string()))?;
        let headers: Arc<Vec<String>> = Arc::new(
            header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
        );

        // calamine 整表加载,这里只做行到记录的转换
        let records: Vec<ImportResult<RawRecord>> = rows
            .map(|row| {
                Ok(RawRecord::new(
                    headers.clone(),
                    row.iter().map(|cell| cell.to_string().trim().to_string()).collect(),
                ))
            })
            .collect();

        Ok(Box::new(records.into_iter()))
    }
}

// ==========================================
// 按扩展名选择记录源
// ==========================================
pub fn open_record_source<P: AsRef<Path>>(path: P) -> ImportResult<Arc<dyn RecordSource>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => Ok(Arc::new(CsvRecordSource::new(path))),
        "xlsx" | "xls" => Ok(Arc::new(ExcelRecordSource::new(path))),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}
