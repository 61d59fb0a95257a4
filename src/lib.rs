// ==========================================
// 客户账户导入系统 - 核心库
// ==========================================
// 技术栈: Rust + tokio + SQLite
// 系统定位: 客户/账户记录分块并发导入 + 报表导出
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体、类型与校验规则
pub mod domain;

// 数据仓储层 - 持久化接口与 SQLite 实现
pub mod repository;

// 导入层 - 记录源、字段映射、分块工作者
pub mod importer;

// 引擎层 - 分块调度与生命周期监听
pub mod engine;

// 配置层 - 导入参数与密钥
pub mod config;

// 报表层 - JSON / XML 导出
pub mod report;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 身份证号加解密
pub mod encryption;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AccountRecord, AccountType, ChunkSummary, CustomerRecord, RecordOutcome, RecordRange,
    RejectionReason,
};

// 引擎
pub use engine::{
    AggregateResult, ChunkScheduler, ChunkStatus, IngestOrchestrator, LifecycleMonitor,
    MonitorRegistry, SchedulerSettings, SchedulingError, TracingMonitor,
};

// 导入
pub use importer::{open_record_source, ImportError, RecordSource};

// 仓储
pub use repository::{PersistenceSink, SqliteSink, StorageError};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "客户账户导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
