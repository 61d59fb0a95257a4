// ==========================================
// 客户账户导入系统 - 任务生命周期监听
// ==========================================
// 职责: 观察分块任务的 启动/否决/完成 事件（仅诊断用途）
// 红线: 监听者不得阻塞、重试或修改调度状态
// 隔离: 监听者自身失败（panic）被吞掉,不影响被观察的任务
// ==========================================

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

// ==========================================
// LifecycleMonitor Trait
// ==========================================
// 实现者: TracingMonitor（测试中另有记录型实现）
pub trait LifecycleMonitor: Send + Sync {
    /// 监听者名称（日志用）
    fn name(&self) -> &str;

    /// 任务即将执行
    fn task_starting(&self, chunk_id: usize);

    /// 任务在执行前被否决（如截止时间已到）
    fn task_vetoed(&self, chunk_id: usize);

    /// 任务结束；error 为 None 表示正常完成
    fn task_completed(&self, chunk_id: usize, error: Option<&str>);
}

/// 结构化日志监听者
#[derive(Debug, Clone, Default)]
pub struct TracingMonitor {
    name: String,
}

impl TracingMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl LifecycleMonitor for TracingMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn task_starting(&self, chunk_id: usize) {
        info!(monitor = %self.name, chunk_id, "任务即将执行");
    }

    fn task_vetoed(&self, chunk_id: usize) {
        warn!(monitor = %self.name, chunk_id, "任务被否决");
    }

    fn task_completed(&self, chunk_id: usize, error: Option<&str>) {
        match error {
            None => info!(monitor = %self.name, chunk_id, "任务执行完成"),
            Some(e) => error!(monitor = %self.name, chunk_id, error = e, "任务执行失败"),
        }
    }
}

// ==========================================
// MonitorRegistry - 监听者注册表
// ==========================================
// 调度器在提交任务前持有完整注册表,确保不漏事件
#[derive(Clone, Default)]
pub struct MonitorRegistry {
    monitors: Vec<Arc<dyn LifecycleMonitor>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, monitor: Arc<dyn LifecycleMonitor>) {
        self.monitors.push(monitor);
    }

    pub fn with(mut self, monitor: Arc<dyn LifecycleMonitor>) -> Self {
        self.register(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn task_starting(&self, chunk_id: usize) {
        self.notify(|m| m.task_starting(chunk_id));
    }

    pub fn task_vetoed(&self, chunk_id: usize) {
        self.notify(|m| m.task_vetoed(chunk_id));
    }

    pub fn task_completed(&self, chunk_id: usize, error: Option<&str>) {
        self.notify(|m| m.task_completed(chunk_id, error));
    }

    fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn LifecycleMonitor),
    {
        for monitor in &self.monitors {
            if catch_unwind(AssertUnwindSafe(|| f(monitor.as_ref()))).is_err() {
                warn!(monitor = monitor.name(), "监听者执行失败,已忽略");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMonitor {
        events: Mutex<Vec<String>>,
    }

    impl LifecycleMonitor for RecordingMonitor {
        fn name(&self) -> &str {
            "recording"
        }
        fn task_starting(&self, chunk_id: usize) {
            self.events.lock().unwrap().push(format!("start:{}", chunk_id));
        }
        fn task_vetoed(&self, chunk_id: usize) {
            self.events.lock().unwrap().push(format!("veto:{}", chunk_id));
        }
        fn task_completed(&self, chunk_id: usize, error: Option<&str>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done:{}:{}", chunk_id, error.unwrap_or("ok")));
        }
    }

    struct PanickingMonitor;

    impl LifecycleMonitor for PanickingMonitor {
        fn name(&self) -> &str {
            "panicking"
        }
        fn task_starting(&self, _chunk_id: usize) {
            panic!("log sink unavailable");
        }
        fn task_vetoed(&self, _chunk_id: usize) {
            panic!("log sink unavailable");
        }
        fn task_completed(&self, _chunk_id: usize, _error: Option<&str>) {
            panic!("log sink unavailable");
        }
    }

    #[test]
    fn test_registry_fans_out() {
        let recording = Arc::new(RecordingMonitor::default());
        let registry = MonitorRegistry::new()
            .with(Arc::new(TracingMonitor::new("log")))
            .with(recording.clone());

        registry.task_starting(1);
        registry.task_completed(1, None);
        registry.task_vetoed(2);
        registry.task_completed(3, Some("deadline exceeded"));

        assert_eq!(registry.len(), 2);
        assert_eq!(
            *recording.events.lock().unwrap(),
            vec!["start:1", "done:1:ok", "veto:2", "done:3:deadline exceeded"]
        );
    }

    #[test]
    fn test_failing_monitor_does_not_stop_others() {
        let recording = Arc::new(RecordingMonitor::default());
        let registry = MonitorRegistry::new()
            .with(Arc::new(PanickingMonitor))
            .with(recording.clone());

        registry.task_starting(1);
        registry.task_completed(1, None);

        assert_eq!(recording.events.lock().unwrap().len(), 2);
    }
}
