use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use monitor_core::config::AppConfig;
use monitor_core::models::{ErrorTableData, MONITOR_DIED_ERROR};
use monitor_core::{Autoscaler, CoordinationStore, ErrorReporter};
use monitor_dispatcher::{ChannelKind, ControlLoop, FlushController, MessageDispatcher};
use monitor_infrastructure::{
    AutoscalingConfig, LoadReportingAutoscaler, MonitorMetrics, RedisCoordinationStore,
    RedisErrorReporter, RedisSubscriber,
};

/// 监控进程：连接存储、订阅频道并驱动控制循环
pub struct MonitorApp {
    config: AppConfig,
    control_loop: ControlLoop,
    metrics: MonitorMetrics,
}

impl MonitorApp {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let metrics = MonitorMetrics::new();

        let store = RedisCoordinationStore::connect(&config.redis, metrics.clone())
            .await
            .context("连接协调存储失败")?;
        let store: Arc<dyn CoordinationStore> = Arc::new(store);

        let mut dispatcher =
            MessageDispatcher::new(config.monitor.max_messages_per_channel, metrics.clone());
        let heartbeat_subscriber =
            RedisSubscriber::subscribe(&config.redis, &config.monitor.heartbeat_batch_channel)
                .await
                .context("订阅心跳频道失败")?;
        dispatcher.subscribe(ChannelKind::HeartbeatBatch, Box::new(heartbeat_subscriber));
        let job_subscriber = RedisSubscriber::subscribe(&config.redis, &config.monitor.job_channel)
            .await
            .context("订阅作业频道失败")?;
        dispatcher.subscribe(ChannelKind::JobRemoved, Box::new(job_subscriber));

        let flush =
            FlushController::new(&config.gcs_flush, store.as_ref(), metrics.clone()).await;
        let autoscaler = create_autoscaler(&config)?;

        let control_loop = ControlLoop::new(
            store,
            dispatcher,
            flush,
            autoscaler,
            config.heartbeat_interval(),
            metrics.clone(),
        );

        Ok(Self {
            config,
            control_loop,
            metrics,
        })
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    /// 运行控制循环；只会在出错时返回
    pub async fn run(mut self) -> Result<()> {
        info!(
            "监控进程已连接 {}，开始运行",
            self.config.redis.address
        );
        self.control_loop.run().await?;
        Ok(())
    }
}

fn create_autoscaler(config: &AppConfig) -> Result<Option<Box<dyn Autoscaler>>> {
    let Some(path) = config
        .autoscaler
        .config_path
        .as_deref()
        .filter(|_| config.autoscaler.is_enabled())
    else {
        info!("未配置自动伸缩，进程生命周期内不启用");
        return Ok(None);
    };

    let autoscaling_config = AutoscalingConfig::load(path)?;
    Ok(Some(Box::new(LoadReportingAutoscaler::new(
        autoscaling_config,
    ))))
}

/// 构造推送给所有 driver 的致命错误报告
pub fn fatal_error_report(error: &anyhow::Error) -> ErrorTableData {
    let message = format!("The monitor failed with the following error:\n{error:?}");
    ErrorTableData::broadcast(MONITOR_DIED_ERROR, message)
}

/// 尽力推送致命错误报告，推送失败只记录日志
pub async fn report_fatal_error(reporter: &dyn ErrorReporter, error: &anyhow::Error) {
    let report = fatal_error_report(error);
    match reporter.push_error(&report).await {
        Ok(()) => info!("已推送监控进程致命错误报告"),
        Err(e) => error!("推送致命错误报告失败: {}", e),
    }
}

/// 使用新的存储连接推送致命错误报告
pub async fn publish_fatal_error(config: &AppConfig, error: &anyhow::Error) {
    match RedisErrorReporter::connect(&config.redis, &config.monitor.error_channel).await {
        Ok(reporter) => report_fatal_error(&reporter, error).await,
        Err(e) => warn!("无法连接存储推送致命错误报告: {}", e),
    }
}
