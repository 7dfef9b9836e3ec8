//! Redis-backed coordination store.
//!
//! The primary shard holds the node table, the shard directory, the flush
//! policy and the error table. Task and object tables are spread over the
//! data shards listed under `RedisShards`.

pub mod shard_client;
pub mod subscriber;

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info, warn};

use monitor_core::config::RedisConfig;
use monitor_core::models::tables::{
    EVENT_LOG_PATTERNS, NODE_TABLE_KEY, OBJECT_TABLE_PREFIX, SHARD_DIRECTORY_KEY,
    TASK_TABLE_PREFIX,
};
use monitor_core::models::{
    ErrorTableData, NodeTableEntry, ObjectId, TaskRecord, TaskTableData,
};
use monitor_core::{
    CoordinationStore, ErrorReporter, MonitorError, MonitorResult, ShardIndex,
};

use crate::metrics_collector::MonitorMetrics;

pub use shard_client::RedisShardClient;
pub use subscriber::RedisSubscriber;

pub struct RedisCoordinationStore {
    primary: RedisShardClient,
    shards: Vec<RedisShardClient>,
    metrics: MonitorMetrics,
}

impl RedisCoordinationStore {
    /// 连接主分片并按分片目录连接所有数据分片
    pub async fn connect(config: &RedisConfig, metrics: MonitorMetrics) -> MonitorResult<Self> {
        let primary = RedisShardClient::connect(0, &config.address, config).await?;

        let directory = primary.list_all(SHARD_DIRECTORY_KEY).await?;
        let mut shards = Vec::with_capacity(directory.len().max(1));
        for (index, raw_address) in directory.iter().enumerate() {
            let address = String::from_utf8(raw_address.clone()).map_err(|e| {
                MonitorError::Decode(format!("invalid shard address at index {index}: {e}"))
            })?;
            shards.push(RedisShardClient::connect(index, &address, config).await?);
        }

        if shards.is_empty() {
            warn!(
                "Shard directory {} is empty, using primary {} as the only data shard",
                SHARD_DIRECTORY_KEY, config.address
            );
            shards.push(primary.clone());
        }

        info!(
            "Connected to coordination store at {} with {} data shard(s)",
            config.address,
            shards.len()
        );
        Ok(Self {
            primary,
            shards,
            metrics,
        })
    }

    fn shard(&self, shard: ShardIndex) -> MonitorResult<&RedisShardClient> {
        self.shards.get(shard).ok_or_else(|| {
            MonitorError::Internal(format!(
                "shard index {shard} out of range ({} shards)",
                self.shards.len()
            ))
        })
    }

    fn observe<T>(&self, operation: &str, started: Instant, result: &MonitorResult<T>) {
        self.metrics
            .record_operation_duration(operation, started.elapsed().as_secs_f64() * 1000.0);
        if result.is_err() {
            self.metrics.record_store_error();
        }
    }

    async fn scan_task_shard(&self, shard: &RedisShardClient) -> MonitorResult<Vec<TaskRecord>> {
        let keys = shard.scan_prefix(TASK_TABLE_PREFIX).await?;
        let values = shard.get_many(&keys).await?;

        let mut records = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            // 扫描与读取之间被删除的键
            let Some(value) = value else { continue };
            match serde_json::from_slice::<TaskTableData>(&value) {
                Ok(data) => records.push(TaskRecord::from(data)),
                Err(e) => warn!(
                    "Skipping malformed task entry {} on shard {}: {}",
                    String::from_utf8_lossy(key),
                    shard.index(),
                    e
                ),
            }
        }
        Ok(records)
    }

    async fn scan_object_shard(&self, shard: &RedisShardClient) -> MonitorResult<Vec<ObjectId>> {
        let keys = shard.scan_prefix(OBJECT_TABLE_PREFIX).await?;
        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            match ObjectId::from_binary(&key[OBJECT_TABLE_PREFIX.len()..]) {
                Ok(object_id) => objects.push(object_id),
                Err(_) => debug!(
                    "Ignoring key {} on shard {}: not an object id",
                    String::from_utf8_lossy(&key),
                    shard.index()
                ),
            }
        }
        Ok(objects)
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    fn shard_count(&self) -> usize {
        self.shards.len()
    }

    async fn read_node_table(&self) -> MonitorResult<Vec<NodeTableEntry>> {
        let started = Instant::now();
        let result = async {
            let raw_entries = self.primary.list_all(NODE_TABLE_KEY).await?;
            raw_entries
                .iter()
                .map(|raw| {
                    serde_json::from_slice::<NodeTableEntry>(raw).map_err(|e| {
                        MonitorError::Decode(format!("malformed node table entry: {e}"))
                    })
                })
                .collect::<MonitorResult<Vec<_>>>()
        }
        .await;
        self.observe("read_node_table", started, &result);
        result
    }

    async fn scan_task_table(&self) -> MonitorResult<Vec<TaskRecord>> {
        let started = Instant::now();
        let mut records = Vec::new();
        let mut result: MonitorResult<()> = Ok(());
        for shard in &self.shards {
            match self.scan_task_shard(shard).await {
                Ok(shard_records) => records.extend(shard_records),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.observe("scan_task_table", started, &result);
        result.map(|_| records)
    }

    async fn scan_object_table(&self) -> MonitorResult<Vec<ObjectId>> {
        let started = Instant::now();
        let mut objects = Vec::new();
        let mut result: MonitorResult<()> = Ok(());
        for shard in &self.shards {
            match self.scan_object_shard(shard).await {
                Ok(shard_objects) => objects.extend(shard_objects),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.observe("scan_object_table", started, &result);
        result.map(|_| objects)
    }

    async fn delete_keys(&self, shard: ShardIndex, keys: &[Vec<u8>]) -> MonitorResult<u64> {
        let started = Instant::now();
        let result = match self.shard(shard) {
            Ok(client) => client.delete(keys).await,
            Err(e) => Err(e),
        };
        self.observe("delete_keys", started, &result);
        result
    }

    async fn get(&self, key: &str) -> MonitorResult<Option<Vec<u8>>> {
        self.primary.get(key.as_bytes()).await
    }

    async fn flush_shard(&self, max_entries: u64) -> MonitorResult<i64> {
        let mut cmd = redis::cmd("HEAD.FLUSH");
        cmd.arg(max_entries);
        self.shard(0)?.execute_command(&cmd).await
    }

    async fn used_memory(&self) -> MonitorResult<u64> {
        let mut cmd = redis::cmd("INFO");
        cmd.arg("memory");
        let info: redis::InfoDict = self.shard(0)?.execute_command(&cmd).await?;
        info.get::<u64>("used_memory").ok_or_else(|| {
            MonitorError::Decode("INFO memory reply carries no used_memory field".to_string())
        })
    }

    async fn flush_event_logs(&self) -> MonitorResult<u64> {
        let mut deleted = 0;
        for pattern in EVENT_LOG_PATTERNS {
            let keys = self.primary.scan_pattern(pattern.as_bytes()).await?;
            deleted += self.primary.delete(&keys).await?;
        }
        debug!("Deleted {} event log key(s) from the primary shard", deleted);
        Ok(deleted)
    }
}

/// 通过主分片的错误表向所有 driver 推送错误
pub struct RedisErrorReporter {
    primary: RedisShardClient,
    error_channel: String,
}

impl RedisErrorReporter {
    pub async fn connect(config: &RedisConfig, error_channel: &str) -> MonitorResult<Self> {
        let primary = RedisShardClient::connect(0, &config.address, config).await?;
        Ok(Self {
            primary,
            error_channel: error_channel.to_string(),
        })
    }

    pub fn error_key(error: &ErrorTableData) -> String {
        format!(
            "{}{}",
            monitor_core::models::tables::ERROR_INFO_PREFIX,
            error.job_id.hex()
        )
    }
}

#[async_trait]
impl ErrorReporter for RedisErrorReporter {
    async fn push_error(&self, error: &ErrorTableData) -> MonitorResult<()> {
        let payload = serde_json::to_vec(error)?;

        let mut push = redis::cmd("RPUSH");
        push.arg(Self::error_key(error)).arg(payload.as_slice());
        let _: i64 = self.primary.execute_command(&push).await?;

        let mut publish = redis::cmd("PUBLISH");
        publish.arg(&self.error_channel).arg(payload.as_slice());
        let _: i64 = self.primary.execute_command(&publish).await?;

        info!(
            "Pushed {} error to {} and channel {}",
            error.error_type,
            Self::error_key(error),
            self.error_channel
        );
        Ok(())
    }
}
