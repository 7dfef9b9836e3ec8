pub mod autoscaler;
pub mod metrics_collector;
pub mod redis_store;

pub use autoscaler::{AutoscalingConfig, LoadReportingAutoscaler};
pub use metrics_collector::{MetricsSnapshot, MonitorMetrics};
pub use redis_store::{
    RedisCoordinationStore, RedisErrorReporter, RedisShardClient, RedisSubscriber,
};
