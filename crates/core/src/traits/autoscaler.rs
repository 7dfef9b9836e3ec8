use async_trait::async_trait;

use crate::load_metrics::LoadMetrics;
use crate::MonitorResult;

/// 外部自动扩缩容组件
#[async_trait]
pub trait Autoscaler: Send {
    /// 每个周期以当前负载快照调用一次
    async fn update(&mut self, load_metrics: &LoadMetrics) -> MonitorResult<()>;

    /// 致命错误路径上调用，终止其创建的所有 worker
    async fn kill_workers(&mut self) -> MonitorResult<()>;
}
