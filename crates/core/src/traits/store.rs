use async_trait::async_trait;

use crate::models::{ErrorTableData, NodeTableEntry, ObjectId, TaskRecord};
use crate::shard::ShardIndex;
use crate::MonitorResult;

/// 分片协调存储抽象接口
///
/// 主分片保存节点表、刷新策略与错误表；任务表与对象表按标识符哈希分布在各数据分片上。
/// 分片之间没有跨分片事务。
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// 数据分片数量，至少为1
    fn shard_count(&self) -> usize;

    /// 一次批量读取完整的节点表日志
    async fn read_node_table(&self) -> MonitorResult<Vec<NodeTableEntry>>;

    /// 扫描所有分片上的任务表
    async fn scan_task_table(&self) -> MonitorResult<Vec<TaskRecord>>;

    /// 扫描所有分片上的对象表
    async fn scan_object_table(&self) -> MonitorResult<Vec<ObjectId>>;

    /// 在指定分片上批量删除物理键，返回存储报告的实际删除数量
    async fn delete_keys(&self, shard: ShardIndex, keys: &[Vec<u8>]) -> MonitorResult<u64>;

    /// 从主分片读取一个键
    async fn get(&self, key: &str) -> MonitorResult<Option<Vec<u8>>>;

    /// 对第一个数据分片执行实验性的刷新命令，返回刷新的条目数
    async fn flush_shard(&self, max_entries: u64) -> MonitorResult<i64>;

    /// 第一个数据分片当前使用的内存（字节）
    async fn used_memory(&self) -> MonitorResult<u64>;

    /// 删除主分片上的事件日志与日志文件键，返回删除数量
    async fn flush_event_logs(&self) -> MonitorResult<u64>;
}

/// 错误上报接口，按存储的错误表约定推送给所有 driver
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn push_error(&self, error: &ErrorTableData) -> MonitorResult<()>;
}
