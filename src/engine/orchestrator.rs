// ==========================================
// 客户账户导入系统 - 导入编排器
// ==========================================
// 用途: 协调客户与账户两条管线的执行顺序
// 依赖: 账户的客户存在性校验读取已提交的客户
// 顺序: CustomersFirst 串行（默认）/ Concurrent 并行
// ==========================================

use crate::config::{AccountOrdering, NationalIdInput};
use crate::encryption::NationalIdCipher;
use crate::engine::monitor::MonitorRegistry;
use crate::engine::scheduler::{AggregateResult, ChunkScheduler, SchedulerSettings, SchedulingError};
use crate::importer::{AccountPipeline, CustomerPipeline, RecordSource};
use crate::repository::PersistenceSink;
use std::sync::Arc;
use tracing::info;

/// 一次完整导入的结果
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub customers: AggregateResult,
    pub accounts: AggregateResult,
}

// ==========================================
// IngestOrchestrator - 导入编排器
// ==========================================
pub struct IngestOrchestrator {
    scheduler: ChunkScheduler,
    sink: Arc<dyn PersistenceSink>,
    cipher: Arc<dyn NationalIdCipher>,
    national_id_input: NationalIdInput,
    ordering: AccountOrdering,
}

impl IngestOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - settings: 分块调度参数（两条管线共用）
    /// - monitors: 生命周期监听者
    /// - sink: 共享持久化实例
    /// - cipher: 身份证号加解密器
    pub fn new(
        settings: SchedulerSettings,
        monitors: MonitorRegistry,
        sink: Arc<dyn PersistenceSink>,
        cipher: Arc<dyn NationalIdCipher>,
    ) -> Self {
        Self {
            scheduler: ChunkScheduler::new(settings).with_monitors(monitors),
            sink,
            cipher,
            national_id_input: NationalIdInput::default(),
            ordering: AccountOrdering::default(),
        }
    }

    pub fn with_ordering(mut self, ordering: AccountOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_national_id_input(mut self, input: NationalIdInput) -> Self {
        self.national_id_input = input;
        self
    }

    /// 只导入客户
    pub async fn ingest_customers(
        &self,
        source: Arc<dyn RecordSource>,
    ) -> Result<AggregateResult, SchedulingError> {
        let pipeline = Arc::new(CustomerPipeline::new(
            self.cipher.clone(),
            self.national_id_input,
        ));
        self.scheduler.run(source, self.sink.clone(), pipeline).await
    }

    /// 只导入账户
    pub async fn ingest_accounts(
        &self,
        source: Arc<dyn RecordSource>,
    ) -> Result<AggregateResult, SchedulingError> {
        self.scheduler
            .run(source, self.sink.clone(), Arc::new(AccountPipeline::new()))
            .await
    }

    /// 按配置的顺序导入客户与账户
    ///
    /// # 返回
    /// - Err(SchedulingError): 任一管线调度失败（客户先行时,账户管线不再启动）
    pub async fn ingest_all(
        &self,
        customers: Arc<dyn RecordSource>,
        accounts: Arc<dyn RecordSource>,
    ) -> Result<IngestOutcome, SchedulingError> {
        info!(ordering = %self.ordering, "开始导入客户与账户");

        match self.ordering {
            AccountOrdering::CustomersFirst => {
                let customers = self.ingest_customers(customers).await?;
                let accounts = self.ingest_accounts(accounts).await?;
                Ok(IngestOutcome {
                    customers,
                    accounts,
                })
            }
            AccountOrdering::Concurrent => {
                let (customers, accounts) = futures::future::join(
                    self.ingest_customers(customers),
                    self.ingest_accounts(accounts),
                )
                .await;
                Ok(IngestOutcome {
                    customers: customers?,
                    accounts: accounts?,
                })
            }
        }
    }
}
