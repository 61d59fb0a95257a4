// ==========================================
// 客户账户导入系统 - 引擎层
// ==========================================
// 职责: 分块调度、生命周期监听、管线编排
// 红线: 引擎不直接访问持久化,只把共享实例交给工作者
// ==========================================

pub mod monitor;
pub mod orchestrator;
pub mod scheduler;

// 重导出核心引擎
pub use monitor::{LifecycleMonitor, MonitorRegistry, TracingMonitor};
pub use orchestrator::{IngestOrchestrator, IngestOutcome};
pub use scheduler::{
    partition, AggregateResult, ChunkReport, ChunkScheduler, ChunkStatus, SchedulerSettings,
    SchedulingError, DEADLINE_EXCEEDED,
};
