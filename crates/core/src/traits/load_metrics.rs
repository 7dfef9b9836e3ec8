use crate::models::ResourceVector;

/// 负载指标写入端，按网络地址保存每个节点的资源快照
pub trait LoadMetricsSink: Send {
    fn update(&mut self, address: &str, total: ResourceVector, available: ResourceVector);
}
