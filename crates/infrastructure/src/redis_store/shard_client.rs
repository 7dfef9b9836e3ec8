use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, FromRedisValue};
use tracing::debug;

use monitor_core::config::RedisConfig;
use monitor_core::{MonitorError, MonitorResult};

const SCAN_BATCH_SIZE: usize = 1000;
const MGET_BATCH_SIZE: usize = 1000;

/// 单个 Redis 分片的连接
#[derive(Clone)]
pub struct RedisShardClient {
    index: usize,
    address: String,
    connection: ConnectionManager,
}

impl RedisShardClient {
    pub async fn connect(index: usize, address: &str, config: &RedisConfig) -> MonitorResult<Self> {
        let client = Client::open(config.build_url_for(address)).map_err(|e| {
            MonitorError::Store(format!("Failed to create Redis client for {address}: {e}"))
        })?;

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                MonitorError::Store(format!(
                    "Timed out after {timeout:?} connecting to Redis shard {index} at {address}"
                ))
            })?
            .map_err(|e| {
                MonitorError::Store(format!(
                    "Failed to connect to Redis shard {index} at {address}: {e}"
                ))
            })?;

        debug!("Connected to Redis shard {} at {}", index, address);
        Ok(Self {
            index,
            address: address.to_string(),
            connection,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn execute_command<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> MonitorResult<T> {
        let mut connection = self.connection.clone();
        cmd.query_async(&mut connection).await.map_err(|e| {
            MonitorError::ShardUnavailable {
                shard: self.index,
                message: format!("Redis command failed on {}: {e}", self.address),
            }
        })
    }

    /// 用 SCAN 遍历所有以 `prefix` 开头的键
    pub async fn scan_prefix(&self, prefix: &[u8]) -> MonitorResult<Vec<Vec<u8>>> {
        self.scan_pattern(&[prefix, b"*"].concat()).await
    }

    pub async fn scan_pattern(&self, pattern: &[u8]) -> MonitorResult<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE);
            let (next_cursor, batch): (u64, Vec<Vec<u8>>) = self.execute_command(&cmd).await?;
            keys.extend(batch);
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(keys)
    }

    pub async fn get(&self, key: &[u8]) -> MonitorResult<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.execute_command(&cmd).await
    }

    pub async fn get_many(&self, keys: &[Vec<u8>]) -> MonitorResult<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(MGET_BATCH_SIZE) {
            let mut cmd = redis::cmd("MGET");
            for key in chunk {
                cmd.arg(key.as_slice());
            }
            let batch: Vec<Option<Vec<u8>>> = self.execute_command(&cmd).await?;
            values.extend(batch);
        }
        Ok(values)
    }

    pub async fn list_all(&self, key: &str) -> MonitorResult<Vec<Vec<u8>>> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(0).arg(-1);
        self.execute_command(&cmd).await
    }

    /// 批量删除，返回 Redis 报告的实际删除数量
    pub async fn delete(&self, keys: &[Vec<u8>]) -> MonitorResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key.as_slice());
        }
        self.execute_command(&cmd).await
    }
}
