use async_trait::async_trait;

use monitor_core::models::tables::{object_key, task_key};
use monitor_core::models::JobId;
use monitor_core::{CoordinationStore, MonitorResult};
use monitor_dispatcher::{JobEntities, JobEntityScanner, JobGarbageCollector, ShardDeletion};
use monitor_infrastructure::MonitorMetrics;
use monitor_testing_utils::*;

/// 返回固定实体集合的扫描器，实体不一定存在于存储中
struct FixedScanner(JobEntities);

#[async_trait]
impl JobEntityScanner for FixedScanner {
    async fn job_entities(
        &self,
        _store: &dyn CoordinationStore,
        _job_id: &JobId,
    ) -> MonitorResult<JobEntities> {
        Ok(self.0.clone())
    }
}

struct TwoShardJob {
    store: InMemoryStore,
    job: JobId,
    keys_on_shard0: Vec<Vec<u8>>,
    keys_on_shard1: Vec<Vec<u8>>,
}

/// 作业 J 拥有 T1..T3，T1 和 O1 在分片 0，T2、T3 和 O2 在分片 1
fn two_shard_job() -> TwoShardJob {
    let store = InMemoryStore::new(2);
    let job = job_id(1);

    let t1 = task_id_on_shard(0, 2, 0);
    let t2 = task_id_on_shard(1, 2, 0);
    let t3 = task_id_on_shard(1, 2, 1);
    let o1 = object_id_on_shard(&t1, 0, 2);
    let o2 = object_id_on_shard(&t2, 1, 2);

    for task in [t1, t2, t3] {
        store.insert_task(&task_data(task, job));
    }
    assert_eq!(store.insert_object(&o1), 0);
    assert_eq!(store.insert_object(&o2), 1);

    TwoShardJob {
        store,
        job,
        keys_on_shard0: vec![task_key(t1.binary()), object_key(o1.binary())],
        keys_on_shard1: vec![
            task_key(t2.binary()),
            task_key(t3.binary()),
            object_key(o2.binary()),
        ],
    }
}

#[tokio::test]
async fn test_two_shard_job_is_fully_reclaimed() {
    let fixture = two_shard_job();
    let collector = JobGarbageCollector::new(MonitorMetrics::new());

    let report = collector
        .collect(&fixture.store, &fixture.job)
        .await
        .unwrap();

    assert_eq!(report.attempted, 5);
    assert_eq!(report.deleted, 5);
    assert_eq!(
        report.shards,
        vec![
            ShardDeletion {
                shard: 0,
                requested: 2,
                deleted: 2,
                error: None,
            },
            ShardDeletion {
                shard: 1,
                requested: 3,
                deleted: 3,
                error: None,
            },
        ]
    );
    assert_eq!(fixture.store.delete_calls(), vec![(0, 2), (1, 3)]);

    for key in fixture.keys_on_shard0.iter() {
        assert!(!fixture.store.contains_key(0, key));
    }
    for key in fixture.keys_on_shard1.iter() {
        assert!(!fixture.store.contains_key(1, key));
    }
    assert!(fixture.store.scan_task_table().await.unwrap().is_empty());
    assert!(fixture.store.scan_object_table().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_jobs_are_untouched() {
    let fixture = two_shard_job();
    let other_job = job_id(2);
    let other_task = task_id_on_shard(0, 2, 5);
    let other_object = object_id_on_shard(&other_task, 1, 2);
    fixture.store.insert_task(&task_data(other_task, other_job));
    fixture.store.insert_object(&other_object);

    let collector = JobGarbageCollector::new(MonitorMetrics::new());
    collector
        .collect(&fixture.store, &fixture.job)
        .await
        .unwrap();

    assert!(fixture.store.contains_key(0, &task_key(other_task.binary())));
    assert!(fixture
        .store
        .contains_key(1, &object_key(other_object.binary())));
    assert_eq!(fixture.store.total_keys(), 2);
}

#[tokio::test]
async fn test_job_without_entities_deletes_nothing() {
    let fixture = two_shard_job();
    let collector = JobGarbageCollector::new(MonitorMetrics::new());

    let report = collector
        .collect(&fixture.store, &job_id(42))
        .await
        .unwrap();

    assert_eq!(report.attempted, 0);
    assert!(report.shards.is_empty());
    assert!(fixture.store.delete_calls().is_empty());
    assert_eq!(fixture.store.total_keys(), 5);
}

#[tokio::test]
async fn test_already_absent_keys_are_tolerated() {
    let store = InMemoryStore::new(2);
    let job = job_id(3);
    let present = task_id_on_shard(0, 2, 0);
    let absent_task = task_id_on_shard(1, 2, 0);
    let absent_object = present.object_id(1);
    store.insert_task(&task_data(present, job));

    let collector = JobGarbageCollector::with_scanner(
        Box::new(FixedScanner(JobEntities {
            tasks: vec![present, absent_task],
            objects: vec![absent_object],
        })),
        MonitorMetrics::new(),
    );

    let report = collector.collect(&store, &job).await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.deleted, 1);
    assert!(report.shards.iter().all(|s| s.error.is_none()));
    assert_eq!(report.shards.iter().map(|s| s.missing()).sum::<u64>(), 2);
    assert_eq!(store.total_keys(), 0);
}

#[tokio::test]
async fn test_unreachable_shard_does_not_stop_others() {
    let fixture = two_shard_job();
    fixture.store.fail_shard(0);
    let metrics = MonitorMetrics::new();
    let collector = JobGarbageCollector::new(metrics.clone());

    let report = collector
        .collect(&fixture.store, &fixture.job)
        .await
        .unwrap();

    assert_eq!(report.attempted, 5);
    assert_eq!(report.deleted, 3);
    assert_eq!(report.shards[0].deleted, 0);
    assert!(report.shards[0].error.is_some());
    assert_eq!(report.shards[1].deleted, 3);

    for key in fixture.keys_on_shard0.iter() {
        assert!(fixture.store.contains_key(0, key));
    }
    assert!(fixture.store.keys_on_shard(1).is_empty());
    assert_eq!(metrics.get_stats().shard_delete_failures, 1);
}

#[tokio::test]
async fn test_second_collection_is_harmless() {
    let fixture = two_shard_job();
    let collector = JobGarbageCollector::new(MonitorMetrics::new());

    collector
        .collect(&fixture.store, &fixture.job)
        .await
        .unwrap();
    let report = collector
        .collect(&fixture.store, &fixture.job)
        .await
        .unwrap();

    assert_eq!(report.attempted, 0);
    assert_eq!(report.deleted, 0);
}

#[tokio::test]
async fn test_scan_failure_propagates() {
    let fixture = two_shard_job();
    fixture.store.set_scan_failure(true);
    let collector = JobGarbageCollector::new(MonitorMetrics::new());

    let result = collector.collect(&fixture.store, &fixture.job).await;

    assert!(result.is_err());
    assert!(fixture.store.delete_calls().is_empty());
}

#[test]
fn test_decode_job_payload() {
    let payload = job_removed_payload(job_id(7));
    let job = JobGarbageCollector::decode(&payload).unwrap();
    assert_eq!(job.job_id, job_id(7));
    assert!(job.is_dead);
}
