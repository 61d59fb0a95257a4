// ==========================================
// 客户账户导入系统 - 导入层
// ==========================================
// 职责: 记录源、字段映射、单条记录管线、分块工作者
// 支持: CSV, Excel
// ==========================================

pub mod chunk_worker;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod record_pipeline;

// 重导出核心类型
pub use chunk_worker::{
    process_chunk, process_chunk_with_progress, CancellationFlag, ChunkProgress, ChunkTask,
};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{Column, FieldReader};
pub use file_parser::{
    open_record_source, CsvRecordSource, ExcelRecordSource, RawRecord, RecordSource, RecordStream,
};
pub use record_pipeline::{AccountPipeline, CustomerPipeline, PipelineKind, RecordPipeline};
