pub mod controller;
pub mod flush_controller;
pub mod heartbeat_handler;
pub mod job_gc;
pub mod message_dispatcher;
pub mod node_registry;

pub use controller::{ControlLoop, LoopState, TickStats};
pub use flush_controller::{FlushController, FlushState};
pub use heartbeat_handler::{HeartbeatHandler, HeartbeatOutcome};
pub use job_gc::{
    plan_deletions, CollectionReport, JobEntities, JobEntityScanner, JobGarbageCollector,
    ScanBackedScanner, ShardDeletion,
};
pub use message_dispatcher::{ChannelKind, DrainStats, MessageDispatcher, MessageRouter};
pub use node_registry::NodeRegistry;
