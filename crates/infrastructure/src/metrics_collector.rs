use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 监控进程运行指标
///
/// 原子计数器保存进程内可查询的累计值，同时写入全局 `metrics` 记录器供导出。
#[derive(Debug, Clone, Default)]
pub struct MonitorMetrics {
    pub heartbeats_applied: Arc<AtomicU64>,
    pub heartbeats_unresolved: Arc<AtomicU64>,
    pub messages_dispatched: Arc<AtomicU64>,
    pub jobs_collected: Arc<AtomicU64>,
    pub keys_requested: Arc<AtomicU64>,
    pub keys_deleted: Arc<AtomicU64>,
    pub shard_delete_failures: Arc<AtomicU64>,
    pub flushes: Arc<AtomicU64>,
    pub store_errors: Arc<AtomicU64>,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录写入负载视图的心跳
    pub fn record_heartbeat_applied(&self) {
        self.heartbeats_applied.fetch_add(1, Ordering::Relaxed);
        counter!("monitor_heartbeats_applied_total").increment(1);
    }

    /// 记录因节点地址无法解析而丢弃的心跳
    pub fn record_heartbeat_unresolved(&self) {
        self.heartbeats_unresolved.fetch_add(1, Ordering::Relaxed);
        counter!("monitor_heartbeats_unresolved_total").increment(1);
    }

    pub fn record_message_dispatched(&self, channel: &str) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
        counter!("monitor_messages_dispatched_total", "channel" => channel.to_string())
            .increment(1);
    }

    /// 记录一次作业回收及其删除结果
    pub fn record_job_collected(&self, requested: u64, deleted: u64) {
        self.jobs_collected.fetch_add(1, Ordering::Relaxed);
        self.keys_requested.fetch_add(requested, Ordering::Relaxed);
        self.keys_deleted.fetch_add(deleted, Ordering::Relaxed);
        counter!("monitor_jobs_collected_total").increment(1);
        counter!("monitor_gc_keys_requested_total").increment(requested);
        counter!("monitor_gc_keys_deleted_total").increment(deleted);
    }

    pub fn record_shard_delete_failure(&self, shard: usize) {
        self.shard_delete_failures.fetch_add(1, Ordering::Relaxed);
        counter!("monitor_gc_shard_failures_total", "shard" => shard.to_string()).increment(1);
    }

    pub fn record_flush(&self, num_flushed: i64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        counter!("monitor_gcs_flushes_total").increment(1);
        gauge!("monitor_gcs_last_flush_entries").set(num_flushed as f64);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
        counter!("monitor_store_errors_total").increment(1);
    }

    pub fn set_registry_size(&self, nodes: usize) {
        gauge!("monitor_node_registry_size").set(nodes as f64);
    }

    /// 记录操作耗时
    pub fn record_operation_duration(&self, operation: &str, duration_ms: f64) {
        histogram!(format!("monitor_{}_duration_ms", operation)).record(duration_ms);
    }

    /// 获取当前统计信息
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            heartbeats_applied: self.heartbeats_applied.load(Ordering::Relaxed),
            heartbeats_unresolved: self.heartbeats_unresolved.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            jobs_collected: self.jobs_collected.load(Ordering::Relaxed),
            keys_requested: self.keys_requested.load(Ordering::Relaxed),
            keys_deleted: self.keys_deleted.load(Ordering::Relaxed),
            shard_delete_failures: self.shard_delete_failures.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub heartbeats_applied: u64,
    pub heartbeats_unresolved: u64,
    pub messages_dispatched: u64,
    pub jobs_collected: u64,
    pub keys_requested: u64,
    pub keys_deleted: u64,
    pub shard_delete_failures: u64,
    pub flushes: u64,
    pub store_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = MonitorMetrics::new();
        metrics.record_heartbeat_applied();
        metrics.record_heartbeat_unresolved();
        metrics.record_job_collected(5, 4);
        metrics.record_job_collected(2, 2);
        metrics.record_flush(100);

        let stats = metrics.get_stats();
        assert_eq!(stats.heartbeats_applied, 1);
        assert_eq!(stats.heartbeats_unresolved, 1);
        assert_eq!(stats.jobs_collected, 2);
        assert_eq!(stats.keys_requested, 7);
        assert_eq!(stats.keys_deleted, 6);
        assert_eq!(stats.flushes, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MonitorMetrics::new();
        let clone = metrics.clone();
        clone.record_message_dispatched("JOB");
        assert_eq!(metrics.get_stats().messages_dispatched, 1);
    }
}
