//! 监控进程配置
//!
//! 加载顺序：内置默认值 → TOML 配置文件 → `MONITOR__` 前缀的环境变量。

pub mod models;

pub use models::*;
