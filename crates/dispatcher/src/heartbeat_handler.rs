use tracing::warn;

use monitor_core::models::{GcsEntry, HeartbeatBatchTableData};
use monitor_core::{LoadMetricsSink, MonitorResult};
use monitor_infrastructure::MonitorMetrics;

use crate::node_registry::NodeRegistry;

/// 一个心跳批次的处理结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatOutcome {
    pub applied: usize,
    pub unresolved: usize,
}

/// 心跳批次处理器：按节点注册表解析地址后写入负载视图
#[derive(Debug, Clone, Default)]
pub struct HeartbeatHandler {
    metrics: MonitorMetrics,
}

impl HeartbeatHandler {
    pub fn new(metrics: MonitorMetrics) -> Self {
        Self { metrics }
    }

    /// 解码心跳频道的通知载荷
    pub fn decode(payload: &[u8]) -> MonitorResult<HeartbeatBatchTableData> {
        GcsEntry::<HeartbeatBatchTableData>::decode_first(payload)
    }

    /// 按数组顺序处理批次中的每个节点快照
    ///
    /// 资源数组长度不一致属于协议错误，立即返回；
    /// 地址无法解析的节点逐条记录警告后丢弃。
    pub fn handle(
        &self,
        batch: &HeartbeatBatchTableData,
        registry: &NodeRegistry,
        sink: &mut dyn LoadMetricsSink,
    ) -> MonitorResult<HeartbeatOutcome> {
        let mut outcome = HeartbeatOutcome::default();

        for heartbeat in &batch.batch {
            let (total, available) = heartbeat.resource_vectors()?;

            match registry.resolve(&heartbeat.client_id) {
                Some(address) => {
                    sink.update(address, total, available);
                    self.metrics.record_heartbeat_applied();
                    outcome.applied += 1;
                }
                None => {
                    warn!("无法找到节点 {} 的网络地址，丢弃其心跳", heartbeat.client_id);
                    self.metrics.record_heartbeat_unresolved();
                    outcome.unresolved += 1;
                }
            }
        }

        Ok(outcome)
    }
}
