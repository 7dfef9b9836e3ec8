pub mod app_config;
pub mod monitor;
pub mod observability;
pub mod redis;

pub use app_config::*;
pub use monitor::*;
pub use observability::*;
pub use redis::*;
