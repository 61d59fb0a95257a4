// ==========================================
// 客户账户导入系统 - 分块工作者
// ==========================================
// 职责: 处理一个记录区间 [start, end],返回分块汇总
// 流程: 独立打开记录源 → 顺序扫描计数 → 区间内逐条处理 → 越过 end 立即停止
// 隔离: 数据源错误只终止本分块；单条落库失败不影响后续记录
// 取消: 每条记录处理前检查取消标志（不会中断单条写入）
// ==========================================

use crate::domain::{ChunkSummary, RecordOutcome, RecordRange};
use crate::importer::file_parser::RecordSource;
use crate::importer::record_pipeline::RecordPipeline;
use crate::repository::PersistenceSink;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ==========================================
// CancellationFlag - 共享取消标志
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ==========================================
// ChunkTask - 分块任务（不可变值）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    pub chunk_id: usize,
    pub range: RecordRange,
}

impl ChunkTask {
    pub fn new(chunk_id: usize, range: RecordRange) -> Self {
        Self { chunk_id, range }
    }
}

// ==========================================
// ChunkProgress - 分块实时计数（调度器可在截止时读取）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ChunkProgress(Arc<ProgressCounters>);

#[derive(Debug, Default)]
struct ProgressCounters {
    processed: AtomicUsize,
    valid: AtomicUsize,
    rejected: AtomicUsize,
    persisted: AtomicUsize,
    persist_failed: AtomicUsize,
}

impl ChunkProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计入一条记录的终态（与 ChunkSummary::record 口径一致）
    pub fn record(&self, outcome: &RecordOutcome) {
        let c = &self.0;
        c.processed.fetch_add(1, Ordering::SeqCst);
        match outcome {
            RecordOutcome::Rejected(_) => {
                c.rejected.fetch_add(1, Ordering::SeqCst);
            }
            RecordOutcome::Persisted => {
                c.valid.fetch_add(1, Ordering::SeqCst);
                c.persisted.fetch_add(1, Ordering::SeqCst);
            }
            RecordOutcome::PersistFailed(_) => {
                c.valid.fetch_add(1, Ordering::SeqCst);
                c.persist_failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// 当前计数快照（error / cancelled 由调用方填写）
    pub fn snapshot(&self) -> ChunkSummary {
        let c = &self.0;
        ChunkSummary {
            records_processed: c.processed.load(Ordering::SeqCst),
            records_valid: c.valid.load(Ordering::SeqCst),
            records_rejected: c.rejected.load(Ordering::SeqCst),
            records_persisted: c.persisted.load(Ordering::SeqCst),
            records_persist_failed: c.persist_failed.load(Ordering::SeqCst),
            ..Default::default()
        }
    }
}

/// 执行一个分块
///
/// # 参数
/// - task: 分块编号与区间
/// - source: 记录源（本函数内独立打开）
/// - sink: 共享持久化实例
/// - pipeline: 客户或账户管线
/// - cancel: 调度器共享的取消标志
///
/// # 返回
/// - ChunkSummary: 区间内记录的计数；提前终止时 error / cancelled 有值
pub fn process_chunk(
    task: &ChunkTask,
    source: &dyn RecordSource,
    sink: &dyn PersistenceSink,
    pipeline: &dyn RecordPipeline,
    cancel: &CancellationFlag,
) -> ChunkSummary {
    process_chunk_with_progress(task, source, sink, pipeline, cancel, &ChunkProgress::new())
}

/// 执行一个分块,并把每条记录的终态同步计入 progress
pub fn process_chunk_with_progress(
    task: &ChunkTask,
    source: &dyn RecordSource,
    sink: &dyn PersistenceSink,
    pipeline: &dyn RecordPipeline,
    cancel: &CancellationFlag,
    progress: &ChunkProgress,
) -> ChunkSummary {
    let range = task.range;
    let mut summary = ChunkSummary::default();

    info!(
        chunk_id = task.chunk_id,
        pipeline = %pipeline.kind(),
        source = source.name(),
        start = range.start(),
        end = range.end(),
        "分块开始"
    );

    let stream = match source.open() {
        Ok(stream) => stream,
        Err(e) => {
            error!(chunk_id = task.chunk_id, error = %e, "记录源打开失败,分块终止");
            summary.error = Some(e.to_string());
            return summary;
        }
    };

    let mut index = 0usize;
    for item in stream {
        if cancel.is_cancelled() {
            warn!(chunk_id = task.chunk_id, row = index + 1, "收到取消信号,分块停止");
            summary.cancelled = true;
            break;
        }

        index += 1;
        if index < range.start() {
            continue;
        }

        let record = match item {
            Ok(record) => record,
            Err(e) => {
                error!(chunk_id = task.chunk_id, row = index, error = %e, "记录读取失败,分块终止");
                summary.error = Some(e.to_string());
                break;
            }
        };

        match pipeline.process_record(index, &record, sink) {
            Ok(outcome) => {
                if let RecordOutcome::Rejected(reason) = &outcome {
                    debug!(
                        chunk_id = task.chunk_id,
                        row = index,
                        reason = reason.code(),
                        detail = %reason,
                        "记录被拒绝"
                    );
                }
                summary.record(&outcome);
                progress.record(&outcome);
            }
            Err(e) => {
                error!(chunk_id = task.chunk_id, row = index, error = %e, "领域对象构建失败,分块终止");
                summary.error = Some(e.to_string());
                break;
            }
        }

        if index >= range.end() {
            break;
        }
    }

    info!(
        chunk_id = task.chunk_id,
        processed = summary.records_processed,
        valid = summary.records_valid,
        rejected = summary.records_rejected,
        persisted = summary.records_persisted,
        persist_failed = summary.records_persist_failed,
        cancelled = summary.cancelled,
        "分块结束"
    );

    summary
}
