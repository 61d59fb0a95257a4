// ==========================================
// 调度截止时间测试
// ==========================================
// 测试目标: 挂起的分块不阻塞兄弟分块结果返回；未开始的分块被否决
// ==========================================


use bank_ingest::engine::{ChunkScheduler, ChunkStatus, MonitorRegistry, SchedulerSettings};
use bank_ingest::importer::{AccountPipeline, CsvRecordSource};
use bank_ingest::logging;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_helpers::*;

fn account_file(dir: &tempfile::TempDir, rows: usize) -> std::path::PathBuf {
    let rows: Vec<String> = (1..=rows)
        .map(|i| account_row(i, &account_number(i), "SAVINGS", 1, 100))
        .collect();
    write_csv(dir, "accounts.csv", ACCOUNT_HEADER, &rows)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hanging_chunk_does_not_block_sibling_results() {
    logging::init_test();

    let dir = tempfile::tempdir().unwrap();
    let path = account_file(&dir, 10);
    // 第 6 条（第二个分块的首条）读取时挂起
    let source = GatedSource::new(Arc::new(CsvRecordSource::new(&path)), 6);
    let release = source.release_handle();

    let monitor = Arc::new(RecordingMonitor::default());
    let sink = Arc::new(CountingSink::default());
    let scheduler = ChunkScheduler::new(SchedulerSettings {
        total_jobs: 2,
        records_per_job: 5,
        timeout: Duration::from_millis(500),
        max_concurrency: None,
    })
    .with_monitors(MonitorRegistry::new().with(monitor.clone()));

    let started = Instant::now();
    let result = scheduler
        .run(Arc::new(source), sink.clone(), Arc::new(AccountPipeline::new()))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(5));
    assert!(result.deadline_exceeded);
    assert!(!result.is_complete());

    assert_eq!(result.chunks[0].status, ChunkStatus::Completed);
    assert_eq!(result.chunks[0].summary.records_persisted, 5);
    assert_eq!(result.chunks[1].status, ChunkStatus::TimedOut);
    assert_eq!(result.totals.records_processed, 5);
    assert!(monitor
        .events()
        .contains(&"done:2:deadline exceeded".to_string()));

    // 放行后工作者观察到取消标志,不再落库
    release.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.account_inserts.load(Ordering::SeqCst), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queued_chunk_is_vetoed_at_deadline() {
    logging::init_test();

    let dir = tempfile::tempdir().unwrap();
    let path = account_file(&dir, 10);
    // 第一个分块在第 3 条挂起,唯一的并发槽位被占用
    let source = GatedSource::new(Arc::new(CsvRecordSource::new(&path)), 3);
    let release = source.release_handle();

    let monitor = Arc::new(RecordingMonitor::default());
    let sink = Arc::new(CountingSink::default());
    let scheduler = ChunkScheduler::new(SchedulerSettings {
        total_jobs: 2,
        records_per_job: 5,
        timeout: Duration::from_millis(300),
        max_concurrency: Some(1),
    })
    .with_monitors(MonitorRegistry::new().with(monitor.clone()));

    let result = scheduler
        .run(Arc::new(source), sink.clone(), Arc::new(AccountPipeline::new()))
        .await
        .unwrap();
    release.store(true, Ordering::SeqCst);

    assert!(result.deadline_exceeded);
    assert_eq!(result.chunks[0].status, ChunkStatus::TimedOut);
    assert_eq!(result.chunks[1].status, ChunkStatus::Vetoed);

    // 截止前已落库的两条仍计入汇总
    let stopped = &result.chunks[0].summary;
    assert_eq!(stopped.records_processed, 2);
    assert_eq!(stopped.records_persisted, 2);
    assert!(stopped.cancelled);
    assert_eq!(result.totals.records_persisted, 2);
    assert_eq!(sink.account_inserts.load(Ordering::SeqCst), 2);
    assert_eq!(result.chunks[1].summary.records_processed, 0);

    let events = monitor.events();
    assert!(events.contains(&"start:1".to_string()));
    assert!(events.contains(&"veto:2".to_string()));
    assert!(!events.contains(&"start:2".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_concurrency_is_rejected() {
    let result = ChunkScheduler::new(SchedulerSettings {
        max_concurrency: Some(0),
        ..Default::default()
    })
    .run(
        Arc::new(CsvRecordSource::new("unused.csv")),
        Arc::new(CountingSink::default()),
        Arc::new(AccountPipeline::new()),
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrency_above_chunk_count_is_capped() {
    logging::init_test();

    let dir = tempfile::tempdir().unwrap();
    let path = account_file(&dir, 10);
    let sink = Arc::new(CountingSink::default());

    let result = ChunkScheduler::new(SchedulerSettings {
        max_concurrency: Some(usize::MAX),
        timeout: Duration::from_secs(30),
        ..Default::default()
    })
    .run(
        Arc::new(CsvRecordSource::new(&path)),
        sink.clone(),
        Arc::new(AccountPipeline::new()),
    )
    .await
    .unwrap();

    assert!(result.is_complete());
    assert_eq!(sink.account_inserts.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unrepresentable_timeout_runs_without_deadline() {
    logging::init_test();

    let dir = tempfile::tempdir().unwrap();
    let path = account_file(&dir, 10);

    let result = ChunkScheduler::new(SchedulerSettings {
        timeout: Duration::from_secs(u64::MAX),
        ..Default::default()
    })
    .run(
        Arc::new(CsvRecordSource::new(&path)),
        Arc::new(CountingSink::default()),
        Arc::new(AccountPipeline::new()),
    )
    .await
    .unwrap();

    assert!(!result.deadline_exceeded);
    assert!(result.is_complete());
    assert_eq!(result.totals.records_persisted, 10);
}
