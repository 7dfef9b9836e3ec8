pub mod autoscaler;
pub mod flush_policy;
pub mod load_metrics;
pub mod pubsub;
pub mod store;

pub use autoscaler::*;
pub use flush_policy::*;
pub use load_metrics::*;
pub use pubsub::*;
pub use store::*;
