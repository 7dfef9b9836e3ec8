pub mod config;
pub mod errors;
pub mod load_metrics;
pub mod models;
pub mod policies;
pub mod shard;
pub mod traits;

pub use errors::*;
pub use load_metrics::{LoadMetrics, ResourceUsage};
pub use shard::{route, IdKind, ShardIndex};
pub use traits::{
    Autoscaler, ChannelMessage, CoordinationStore, ErrorReporter, FlushPolicy, LoadMetricsSink,
    SubscriptionClient,
};
