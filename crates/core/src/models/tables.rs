//! 存储中的表名与物理键约定

/// 任务表物理键前缀
pub const TASK_TABLE_PREFIX: &[u8] = b"RAYLET_TASK";
/// 对象表物理键前缀
pub const OBJECT_TABLE_PREFIX: &[u8] = b"OBJECT";
/// 主分片上的节点表日志
pub const NODE_TABLE_KEY: &str = "CLIENT";
/// 主分片上记录数据分片地址的列表
pub const SHARD_DIRECTORY_KEY: &str = "RedisShards";
/// 错误表键前缀，后接作业ID十六进制
pub const ERROR_INFO_PREFIX: &str = "ERROR_INFO:";
/// 主分片上的事件日志与日志文件键模式
pub const EVENT_LOG_PATTERNS: [&str; 2] = ["event_log:*", "LOGFILE:*"];

pub fn task_key(task_id: &[u8]) -> Vec<u8> {
    prefixed(TASK_TABLE_PREFIX, task_id)
}

pub fn object_key(object_id: &[u8]) -> Vec<u8> {
    prefixed(OBJECT_TABLE_PREFIX, object_id)
}

fn prefixed(prefix: &[u8], id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + id.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(id);
    key
}
