use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info};

use monitor_core::{
    Autoscaler, ChannelMessage, CoordinationStore, LoadMetrics, MonitorError, MonitorResult,
};
use monitor_infrastructure::MonitorMetrics;

use crate::flush_controller::FlushController;
use crate::heartbeat_handler::HeartbeatHandler;
use crate::job_gc::JobGarbageCollector;
use crate::message_dispatcher::{ChannelKind, MessageDispatcher, MessageRouter};
use crate::node_registry::NodeRegistry;

/// 控制循环状态；没有优雅停止，出错即终止
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Running,
    Terminated,
}

/// 单个周期的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickStats {
    pub nodes: usize,
    pub heartbeats_applied: usize,
    pub heartbeats_unresolved: usize,
    pub jobs_collected: usize,
    pub keys_deleted: u64,
    pub messages_dispatched: usize,
    pub flushed: Option<i64>,
}

/// 周期内把通知分发给心跳处理器或作业回收器
struct TickRouter<'a> {
    store: &'a dyn CoordinationStore,
    registry: &'a NodeRegistry,
    load_metrics: &'a mut LoadMetrics,
    heartbeat_handler: &'a HeartbeatHandler,
    job_gc: &'a JobGarbageCollector,
    stats: &'a mut TickStats,
}

#[async_trait]
impl<'a> MessageRouter for TickRouter<'a> {
    async fn route(&mut self, kind: ChannelKind, message: ChannelMessage) -> MonitorResult<()> {
        match kind {
            ChannelKind::HeartbeatBatch => {
                let batch = HeartbeatHandler::decode(&message.payload)?;
                let outcome = self
                    .heartbeat_handler
                    .handle(&batch, self.registry, &mut *self.load_metrics)?;
                self.stats.heartbeats_applied += outcome.applied;
                self.stats.heartbeats_unresolved += outcome.unresolved;
            }
            ChannelKind::JobRemoved => {
                let job = JobGarbageCollector::decode(&message.payload)?;
                info!("作业 {} 已移除，开始回收其任务与对象条目", job.job_id);
                let report = self.job_gc.collect(self.store, &job.job_id).await?;
                self.stats.jobs_collected += 1;
                self.stats.keys_deleted += report.deleted;
            }
        }
        Ok(())
    }
}

/// 监控控制循环
///
/// 每个周期依次刷新节点注册表、调用自动伸缩器、尝试刷新 GCS、排空订阅消息，
/// 然后休眠一个心跳间隔。任一步骤出错时先通知自动伸缩器终止 worker，再把错误返回给调用方。
pub struct ControlLoop {
    store: Arc<dyn CoordinationStore>,
    registry: NodeRegistry,
    load_metrics: LoadMetrics,
    autoscaler: Option<Box<dyn Autoscaler>>,
    flush: FlushController,
    dispatcher: MessageDispatcher,
    heartbeat_handler: HeartbeatHandler,
    job_gc: JobGarbageCollector,
    interval: Duration,
    state: LoopState,
    metrics: MonitorMetrics,
}

impl ControlLoop {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        dispatcher: MessageDispatcher,
        flush: FlushController,
        autoscaler: Option<Box<dyn Autoscaler>>,
        interval: Duration,
        metrics: MonitorMetrics,
    ) -> Self {
        Self {
            store,
            registry: NodeRegistry::new(),
            load_metrics: LoadMetrics::new(),
            autoscaler,
            flush,
            dispatcher,
            heartbeat_handler: HeartbeatHandler::new(metrics.clone()),
            job_gc: JobGarbageCollector::new(metrics.clone()),
            interval,
            state: LoopState::Initializing,
            metrics,
        }
    }

    pub fn with_job_collector(mut self, job_gc: JobGarbageCollector) -> Self {
        self.job_gc = job_gc;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn load_metrics(&self) -> &LoadMetrics {
        &self.load_metrics
    }

    pub fn flush_controller(&self) -> &FlushController {
        &self.flush
    }

    /// 持续运行直到出错
    pub async fn run(&mut self) -> MonitorResult<()> {
        info!(
            "监控循环启动，订阅频道 {:?}，心跳间隔 {:?}",
            self.dispatcher.channels(),
            self.interval
        );
        loop {
            self.tick().await?;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// 执行一个周期；出错后循环进入终止状态
    pub async fn tick(&mut self) -> MonitorResult<TickStats> {
        if self.state == LoopState::Terminated {
            return Err(MonitorError::Internal("监控循环已终止".to_string()));
        }
        self.state = LoopState::Running;

        let started = Instant::now();
        match self.run_tick().await {
            Ok(stats) => {
                self.metrics.record_operation_duration(
                    "tick",
                    started.elapsed().as_secs_f64() * 1000.0,
                );
                debug!("周期完成: {:?}; {}", stats, self.load_metrics.summary());
                Ok(stats)
            }
            Err(e) => {
                self.terminate(&e).await;
                Err(e)
            }
        }
    }

    async fn run_tick(&mut self) -> MonitorResult<TickStats> {
        let store = self.store.as_ref();

        self.registry = NodeRegistry::refresh(store).await?;
        self.metrics.set_registry_size(self.registry.len());
        self.load_metrics
            .prune_active_ips(&self.registry.addresses());

        if let Some(autoscaler) = self.autoscaler.as_mut() {
            autoscaler.update(&self.load_metrics).await?;
        }

        let mut stats = TickStats {
            nodes: self.registry.len(),
            flushed: self.flush.maybe_flush(store).await?,
            ..TickStats::default()
        };

        let mut router = TickRouter {
            store,
            registry: &self.registry,
            load_metrics: &mut self.load_metrics,
            heartbeat_handler: &self.heartbeat_handler,
            job_gc: &self.job_gc,
            stats: &mut stats,
        };
        let drained = self.dispatcher.drain(&mut router).await?;
        stats.messages_dispatched = drained.total;

        Ok(stats)
    }

    async fn terminate(&mut self, cause: &MonitorError) {
        self.state = LoopState::Terminated;
        error!("监控循环出错终止: {}", cause);

        if let Some(autoscaler) = self.autoscaler.as_mut() {
            match autoscaler.kill_workers().await {
                Ok(()) => info!("已通知自动伸缩器终止其创建的 worker"),
                Err(e) => error!("通知自动伸缩器终止 worker 失败: {}", e),
            }
        }
    }
}
