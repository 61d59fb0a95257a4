// ==========================================
// 客户账户导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod persistence_sink;
pub mod sqlite_sink;

// 重导出核心仓储
pub use error::{StorageError, StorageResult};
pub use persistence_sink::{PersistenceSink, ReportRow};
pub use sqlite_sink::SqliteSink;
