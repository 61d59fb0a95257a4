// ==========================================
// 客户账户导入系统 - 分块调度器
// ==========================================
// 职责: 记录区间分区 → 每块一个任务并发执行 → 截止时间内汇总结果
// 执行器: tokio（spawn_blocking 承载同步工作者,Semaphore 限制并发度）
// 截止: 到期后设置取消标志、停止等待,未完成分块记为 TimedOut/Vetoed
// 隔离: 单个分块的错误或 panic 不影响兄弟分块
// ==========================================

use crate::domain::{ChunkSummary, RecordRange};
use crate::engine::monitor::MonitorRegistry;
use crate::importer::{
    process_chunk_with_progress, CancellationFlag, ChunkProgress, ChunkTask, PipelineKind,
    RecordPipeline, RecordSource,
};
use crate::repository::PersistenceSink;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// 截止时间到达时上报给监听者的错误描述
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

// 分块执行状态（调度器与任务之间的握手）
const STATE_PENDING: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_VETOED: u8 = 2;

// ==========================================
// SchedulingError - 调度级错误（对整次运行致命）
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("分区参数非法: total_jobs={total_jobs}, records_per_job={records_per_job}")]
    InvalidPartition {
        total_jobs: usize,
        records_per_job: usize,
    },

    #[error("并发度非法: {0}")]
    InvalidConcurrency(usize),

    #[error("执行器不可用: {0}")]
    ExecutorUnavailable(String),
}

/// 将 [1, total_jobs * records_per_job] 切分为连续、不重叠、升序的区间
///
/// # 返回
/// - Ok(Vec<RecordRange>): 长度为 total_jobs
/// - Err(InvalidPartition): 任一参数为 0 或总数溢出
pub fn partition(
    total_jobs: usize,
    records_per_job: usize,
) -> Result<Vec<RecordRange>, SchedulingError> {
    let invalid = || SchedulingError::InvalidPartition {
        total_jobs,
        records_per_job,
    };

    if total_jobs == 0 || records_per_job == 0 {
        return Err(invalid());
    }
    total_jobs.checked_mul(records_per_job).ok_or_else(invalid)?;

    (0..total_jobs)
        .map(|job| {
            let start = job * records_per_job + 1;
            let end = start + records_per_job - 1;
            RecordRange::new(start, end).ok_or_else(invalid)
        })
        .collect()
}

// ==========================================
// 调度参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub total_jobs: usize,
    pub records_per_job: usize,
    pub timeout: Duration,
    /// None 表示每个分块一个并发槽位
    pub max_concurrency: Option<usize>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            total_jobs: 2,
            records_per_job: 5,
            timeout: Duration::from_secs(60),
            max_concurrency: None,
        }
    }
}

// ==========================================
// 运行结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkStatus {
    Completed,
    /// 数据源不可读或领域构建失败,分块提前终止
    Failed,
    /// 截止时间到达时仍在执行
    TimedOut,
    /// 截止时间到达时尚未开始
    Vetoed,
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub chunk_id: usize,
    pub range: RecordRange,
    pub status: ChunkStatus,
    pub summary: ChunkSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub run_id: String,
    pub pipeline: PipelineKind,
    pub source: String,
    /// 按 chunk_id 升序
    pub chunks: Vec<ChunkReport>,
    pub totals: ChunkSummary,
    pub deadline_exceeded: bool,
    pub elapsed_ms: u64,
}

impl AggregateResult {
    /// 所有分块均正常完成
    pub fn is_complete(&self) -> bool {
        self.chunks
            .iter()
            .all(|c| c.status == ChunkStatus::Completed)
    }

    pub fn count_status(&self, status: ChunkStatus) -> usize {
        self.chunks.iter().filter(|c| c.status == status).count()
    }
}

/// 任务输出: None 表示任务在开始前被否决
type TaskOutput = Option<Result<ChunkSummary, tokio::task::JoinError>>;

// ==========================================
// ChunkScheduler
// ==========================================
pub struct ChunkScheduler {
    settings: SchedulerSettings,
    monitors: Arc<MonitorRegistry>,
}

impl ChunkScheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            settings,
            monitors: Arc::new(MonitorRegistry::new()),
        }
    }

    /// 注册监听者（须在 run 之前）
    pub fn with_monitors(mut self, monitors: MonitorRegistry) -> Self {
        self.monitors = Arc::new(monitors);
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// 执行一次分块导入
    ///
    /// # 参数
    /// - source: 记录源（每个分块独立打开）
    /// - sink: 共享持久化实例
    /// - pipeline: 客户或账户管线
    ///
    /// # 返回
    /// - Ok(AggregateResult): 截止时间内可得的汇总（含超时/否决分块）
    /// - Err(SchedulingError): 分区或并发参数非法
    pub async fn run(
        &self,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn PersistenceSink>,
        pipeline: Arc<dyn RecordPipeline>,
    ) -> Result<AggregateResult, SchedulingError> {
        let ranges = partition(self.settings.total_jobs, self.settings.records_per_job)?;
        // 槽位数不超过分块数
        let concurrency = match self.settings.max_concurrency {
            Some(0) => return Err(SchedulingError::InvalidConcurrency(0)),
            Some(n) => n.min(ranges.len()),
            None => ranges.len(),
        };
        if concurrency > Semaphore::MAX_PERMITS {
            return Err(SchedulingError::InvalidConcurrency(concurrency));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let kind = pipeline.kind();
        let started = Instant::now();
        // 超出 Instant 可表示范围时视为无截止时间
        let deadline = started.checked_add(self.settings.timeout);
        if deadline.is_none() {
            warn!(
                timeout_secs = self.settings.timeout.as_secs(),
                "超时设置超出可表示范围,本次调度不设截止时间"
            );
        }

        info!(
            run_id = %run_id,
            pipeline = %kind,
            source = source.name(),
            chunks = ranges.len(),
            concurrency,
            timeout_secs = self.settings.timeout.as_secs(),
            "开始分块调度"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let cancel = CancellationFlag::new();
        let tasks: Vec<ChunkTask> = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| ChunkTask::new(i + 1, *range))
            .collect();
        let states: Vec<Arc<AtomicU8>> = tasks
            .iter()
            .map(|_| Arc::new(AtomicU8::new(STATE_PENDING)))
            .collect();
        let progress: Vec<ChunkProgress> = tasks.iter().map(|_| ChunkProgress::new()).collect();

        let mut pending = FuturesUnordered::new();
        for ((task, state), chunk_progress) in tasks
            .iter()
            .copied()
            .zip(states.iter().cloned())
            .zip(progress.iter().cloned())
        {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let monitors = self.monitors.clone();
            let source = source.clone();
            let sink = sink.clone();
            let pipeline = pipeline.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                if cancel.is_cancelled()
                    || state
                        .compare_exchange(
                            STATE_PENDING,
                            STATE_STARTED,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        )
                        .is_err()
                {
                    return None;
                }

                monitors.task_starting(task.chunk_id);
                let output: TaskOutput = Some(
                    tokio::task::spawn_blocking(move || {
                        process_chunk_with_progress(
                            &task,
                            source.as_ref(),
                            sink.as_ref(),
                            pipeline.as_ref(),
                            &cancel,
                            &chunk_progress,
                        )
                    })
                    .await,
                );
                output
            });

            let chunk_id = task.chunk_id;
            pending.push(async move { (chunk_id, handle.await) });
        }

        let mut reports: Vec<Option<ChunkReport>> = vec![None; tasks.len()];
        let mut deadline_exceeded = false;

        loop {
            let next = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, pending.next()).await.ok(),
                None => Some(pending.next().await),
            };
            match next {
                Some(Some((chunk_id, joined))) => {
                    let task = tasks[chunk_id - 1];
                    let output = joined.unwrap_or_else(|e| Some(Err(e)));
                    reports[chunk_id - 1] = Some(self.finish_chunk(task, output));
                }
                Some(None) => break,
                None => {
                    deadline_exceeded = true;
                    break;
                }
            }
        }

        if deadline_exceeded {
            cancel.cancel();
            warn!(run_id = %run_id, pipeline = %kind, "调度截止时间已到,取消未完成分块");

            for (slot, ((task, state), chunk_progress)) in reports
                .iter_mut()
                .zip(tasks.iter().zip(states.iter()).zip(progress.iter()))
            {
                if slot.is_some() {
                    continue;
                }

                let vetoed = state
                    .compare_exchange(
                        STATE_PENDING,
                        STATE_VETOED,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_ok();
                let (status, summary) = if vetoed {
                    self.monitors.task_vetoed(task.chunk_id);
                    (ChunkStatus::Vetoed, ChunkSummary::default())
                } else {
                    self.monitors
                        .task_completed(task.chunk_id, Some(DEADLINE_EXCEEDED));
                    // 截止前已完成的记录仍计入
                    let summary = ChunkSummary {
                        cancelled: true,
                        ..chunk_progress.snapshot()
                    };
                    (ChunkStatus::TimedOut, summary)
                };

                *slot = Some(ChunkReport {
                    chunk_id: task.chunk_id,
                    range: task.range,
                    status,
                    summary,
                });
            }
        }

        let chunks: Vec<ChunkReport> = reports.into_iter().flatten().collect();
        let mut totals = ChunkSummary::default();
        for report in &chunks {
            totals.absorb(&report.summary);
        }

        let result = AggregateResult {
            run_id,
            pipeline: kind,
            source: source.name().to_string(),
            chunks,
            totals,
            deadline_exceeded,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            run_id = %result.run_id,
            pipeline = %kind,
            processed = result.totals.records_processed,
            valid = result.totals.records_valid,
            rejected = result.totals.records_rejected,
            persisted = result.totals.records_persisted,
            completed = result.count_status(ChunkStatus::Completed),
            timed_out = result.count_status(ChunkStatus::TimedOut),
            elapsed_ms = result.elapsed_ms,
            "分块调度结束"
        );

        Ok(result)
    }

    /// 在独立 tokio 运行时中执行 run（供同步调用方使用）
    pub fn run_blocking(
        &self,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn PersistenceSink>,
        pipeline: Arc<dyn RecordPipeline>,
    ) -> Result<AggregateResult, SchedulingError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| SchedulingError::ExecutorUnavailable(e.to_string()))?;

        let result = runtime.block_on(self.run(source, sink, pipeline));
        // 不等待已超时的工作线程
        runtime.shutdown_background();
        result
    }

    fn finish_chunk(&self, task: ChunkTask, output: TaskOutput) -> ChunkReport {
        let (status, summary) = match output {
            None => {
                self.monitors.task_vetoed(task.chunk_id);
                (ChunkStatus::Vetoed, ChunkSummary::default())
            }
            Some(Err(e)) => {
                error!(chunk_id = task.chunk_id, error = %e, "分块任务 panic");
                let message = format!("任务异常终止: {}", e);
                self.monitors.task_completed(task.chunk_id, Some(&message));
                let summary = ChunkSummary {
                    error: Some(message),
                    ..Default::default()
                };
                (ChunkStatus::Panicked, summary)
            }
            Some(Ok(summary)) => {
                let status = if summary.error.is_some() {
                    ChunkStatus::Failed
                } else if summary.cancelled {
                    ChunkStatus::TimedOut
                } else {
                    ChunkStatus::Completed
                };
                self.monitors
                    .task_completed(task.chunk_id, summary.error.as_deref());
                (status, summary)
            }
        };

        ChunkReport {
            chunk_id: task.chunk_id,
            range: task.range,
            status,
            summary,
        }
    }
}
