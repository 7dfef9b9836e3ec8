pub mod error_info;
pub mod gcs_entry;
pub mod heartbeat;
pub mod ids;
pub mod job;
pub mod node;
pub mod resources;
pub mod tables;
pub mod task;

pub use error_info::*;
pub use gcs_entry::*;
pub use heartbeat::*;
pub use ids::*;
pub use job::*;
pub use node::*;
pub use resources::*;
pub use task::*;
