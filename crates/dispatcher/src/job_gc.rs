//! 作业结束后的分片状态回收
//!
//! 扫描任务表与对象表找出属于作业的条目，按标识符路由到分片后逐分片批量删除。
//! 回收是尽力而为的：删除数量不足只记录日志，不重试也不返回错误。

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tracing::{info, warn};

use monitor_core::models::tables::{object_key, task_key};
use monitor_core::models::{GcsEntry, JobId, JobTableData, ObjectId, TaskId};
use monitor_core::{route, CoordinationStore, MonitorResult, ShardIndex};
use monitor_infrastructure::MonitorMetrics;

/// 属于某个作业的任务与对象
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobEntities {
    pub tasks: Vec<TaskId>,
    pub objects: Vec<ObjectId>,
}

impl JobEntities {
    pub fn len(&self) -> usize {
        self.tasks.len() + self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.objects.is_empty()
    }
}

/// 查找作业所属实体的策略接口
#[async_trait]
pub trait JobEntityScanner: Send + Sync {
    async fn job_entities(
        &self,
        store: &dyn CoordinationStore,
        job_id: &JobId,
    ) -> MonitorResult<JobEntities>;
}

/// 全表扫描实现：遍历所有任务与对象，复杂度与集群内实体总数成正比
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanBackedScanner;

#[async_trait]
impl JobEntityScanner for ScanBackedScanner {
    async fn job_entities(
        &self,
        store: &dyn CoordinationStore,
        job_id: &JobId,
    ) -> MonitorResult<JobEntities> {
        let mut task_set = HashSet::new();
        let mut tasks = Vec::new();
        for record in store.scan_task_table().await? {
            if record.job_id == *job_id && task_set.insert(record.task_id) {
                tasks.push(record.task_id);
            }
        }

        let mut object_set = HashSet::new();
        let mut objects = Vec::new();
        for object_id in store.scan_object_table().await? {
            if task_set.contains(&object_id.task_id()) && object_set.insert(object_id) {
                objects.push(object_id);
            }
        }

        Ok(JobEntities { tasks, objects })
    }
}

/// 单个分片的删除结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDeletion {
    pub shard: ShardIndex,
    pub requested: u64,
    pub deleted: u64,
    pub error: Option<String>,
}

impl ShardDeletion {
    pub fn missing(&self) -> u64 {
        self.requested.saturating_sub(self.deleted)
    }
}

/// 一次作业回收的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub job_id: JobId,
    pub deleted: u64,
    pub attempted: u64,
    pub shards: Vec<ShardDeletion>,
}

/// 把实体的物理键按分片分桶，空分片不出现在结果中
pub fn plan_deletions(
    entities: &JobEntities,
    shard_count: usize,
) -> BTreeMap<ShardIndex, Vec<Vec<u8>>> {
    let mut plan: BTreeMap<ShardIndex, Vec<Vec<u8>>> = BTreeMap::new();
    for task_id in &entities.tasks {
        plan.entry(route(task_id.binary(), shard_count))
            .or_default()
            .push(task_key(task_id.binary()));
    }
    for object_id in &entities.objects {
        plan.entry(route(object_id.binary(), shard_count))
            .or_default()
            .push(object_key(object_id.binary()));
    }
    plan
}

pub struct JobGarbageCollector {
    scanner: Box<dyn JobEntityScanner>,
    metrics: MonitorMetrics,
}

impl JobGarbageCollector {
    pub fn new(metrics: MonitorMetrics) -> Self {
        Self::with_scanner(Box::new(ScanBackedScanner), metrics)
    }

    pub fn with_scanner(scanner: Box<dyn JobEntityScanner>, metrics: MonitorMetrics) -> Self {
        Self { scanner, metrics }
    }

    /// 解码作业移除频道的通知载荷
    pub fn decode(payload: &[u8]) -> MonitorResult<JobTableData> {
        GcsEntry::<JobTableData>::decode_first(payload)
    }

    /// 回收作业在所有分片上的任务与对象条目
    ///
    /// 扫描失败直接返回错误。单个分片删除失败只影响该分片，
    /// 与删除数量不足一样按差额记录，其余分片照常处理。
    pub async fn collect(
        &self,
        store: &dyn CoordinationStore,
        job_id: &JobId,
    ) -> MonitorResult<CollectionReport> {
        let entities = self.scanner.job_entities(store, job_id).await?;
        let plan = plan_deletions(&entities, store.shard_count());

        let mut report = CollectionReport {
            job_id: *job_id,
            deleted: 0,
            attempted: 0,
            shards: Vec::with_capacity(plan.len()),
        };

        for (shard, keys) in plan {
            let requested = keys.len() as u64;
            let (deleted, error) = match store.delete_keys(shard, &keys).await {
                Ok(deleted) => (deleted, None),
                Err(e) => {
                    self.metrics.record_shard_delete_failure(shard);
                    (0, Some(e.to_string()))
                }
            };

            info!("已从分片 {} 删除作业 {} 的 {} 个条目", shard, job_id, deleted);
            if deleted < requested {
                warn!(
                    "分片 {} 上有 {} 个作业 {} 的条目未能删除{}",
                    shard,
                    requested - deleted,
                    job_id,
                    error
                        .as_deref()
                        .map(|e| format!(": {e}"))
                        .unwrap_or_default()
                );
            }

            report.attempted += requested;
            report.deleted += deleted;
            report.shards.push(ShardDeletion {
                shard,
                requested,
                deleted,
                error,
            });
        }

        self.metrics
            .record_job_collected(report.attempted, report.deleted);
        Ok(report)
    }
}
