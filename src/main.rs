// ==========================================
// 客户账户导入系统 - 命令行入口
// ==========================================
// 用法:
//   bank-ingest ingest [customers.csv] [accounts.csv]
//   bank-ingest report json|xml <out>
//   bank-ingest init-db
// 环境变量: BANK_INGEST_DB_PATH, BANK_INGEST_ENCRYPTION_KEY, RUST_LOG
// ==========================================

use anyhow::{bail, Context};
use bank_ingest::config::{get_default_db_path, ConfigManager};
use bank_ingest::engine::{AggregateResult, IngestOrchestrator, MonitorRegistry, TracingMonitor};
use bank_ingest::report::{export_report, ReportFormat};
use bank_ingest::{logging, open_record_source, SqliteSink};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", bank_ingest::APP_NAME, bank_ingest::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "运行失败");
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let command = args.first().map(String::as_str).unwrap_or("help");
    match command {
        "ingest" => ingest(&args[1..]),
        "report" => report(&args[1..]),
        "init-db" => init_db(),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn open_sink() -> anyhow::Result<SqliteSink> {
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    SqliteSink::open(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))
}

fn ingest(args: &[String]) -> anyhow::Result<()> {
    let sink = open_sink()?;
    let config_manager = ConfigManager::from_connection(sink.connection())?;
    let config = config_manager.load_ingest_config()?;
    let cipher = config_manager.build_cipher()?;

    let customers_file = args.first().cloned().unwrap_or(config.customers_file.clone());
    let accounts_file = args.get(1).cloned().unwrap_or(config.accounts_file.clone());
    let customers = open_record_source(&customers_file)?;
    let accounts = open_record_source(&accounts_file)?;

    let monitors = MonitorRegistry::new().with(Arc::new(TracingMonitor::new("ingest")));
    let orchestrator = IngestOrchestrator::new(
        config.scheduler_settings(),
        monitors,
        Arc::new(sink),
        cipher,
    )
    .with_ordering(config.ordering)
    .with_national_id_input(config.national_id_input);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("无法创建异步运行时")?;
    let outcome = runtime.block_on(orchestrator.ingest_all(customers, accounts));
    // 已超时的工作线程不再等待
    runtime.shutdown_background();

    let outcome = outcome.context("调度失败,导入中止")?;
    print_result(&outcome.customers);
    print_result(&outcome.accounts);
    Ok(())
}

fn report(args: &[String]) -> anyhow::Result<()> {
    let (Some(format), Some(out)) = (args.first(), args.get(1)) else {
        bail!("用法: bank-ingest report json|xml <out>");
    };
    let format: ReportFormat = format.parse()?;

    let sink = open_sink()?;
    let config = ConfigManager::from_connection(sink.connection())?.load_ingest_config()?;
    let rows = export_report(&sink, config.report_min_balance, format, Path::new(out))?;

    println!("报表已写入 {}（{} 行）", out, rows);
    Ok(())
}

fn init_db() -> anyhow::Result<()> {
    let sink = open_sink()?;
    let conn = sink.connection();
    let guard = conn
        .lock()
        .map_err(|e| anyhow::anyhow!("数据库锁获取失败: {}", e))?;
    let version = bank_ingest::db::read_schema_version(&guard)?;
    println!("数据库已初始化,schema_version={}", version.unwrap_or(0));
    Ok(())
}

fn print_result(result: &AggregateResult) {
    println!(
        "[{}] run_id={} source={} 耗时 {}ms{}",
        result.pipeline,
        result.run_id,
        result.source,
        result.elapsed_ms,
        if result.deadline_exceeded { "（超时）" } else { "" }
    );
    for chunk in &result.chunks {
        let s = &chunk.summary;
        println!(
            "  chunk {} {} {:?}: processed={} valid={} rejected={} persisted={} persist_failed={}{}",
            chunk.chunk_id,
            chunk.range,
            chunk.status,
            s.records_processed,
            s.records_valid,
            s.records_rejected,
            s.records_persisted,
            s.records_persist_failed,
            s.error
                .as_deref()
                .map(|e| format!(" error={}", e))
                .unwrap_or_default()
        );
    }
    let t = &result.totals;
    println!(
        "  合计: processed={} valid={} rejected={} persisted={}",
        t.records_processed, t.records_valid, t.records_rejected, t.records_persisted
    );
}

fn print_usage() {
    println!("{} v{}", bank_ingest::APP_NAME, bank_ingest::VERSION);
    println!();
    println!("用法:");
    println!("  bank-ingest ingest [customers.csv] [accounts.csv]   分块导入客户与账户");
    println!("  bank-ingest report json|xml <out>                   导出余额报表");
    println!("  bank-ingest init-db                                 初始化数据库");
    println!();
    println!("环境变量:");
    println!("  BANK_INGEST_DB_PATH          数据库路径");
    println!("  BANK_INGEST_ENCRYPTION_KEY   身份证号加密密钥（64 位十六进制）");
    println!("  RUST_LOG                     日志级别（默认 info）");
}
