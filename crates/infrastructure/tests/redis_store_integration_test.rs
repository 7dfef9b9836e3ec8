use anyhow::Result;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::redis::Redis;

use monitor_core::config::RedisConfig;
use monitor_core::models::tables::{object_key, task_key, ERROR_INFO_PREFIX, NODE_TABLE_KEY};
use monitor_core::models::{
    ErrorTableData, JobId, NodeId, NodeTableEntry, TaskId, TaskSpec, TaskTableData,
    MONITOR_DIED_ERROR,
};
use monitor_core::{CoordinationStore, ErrorReporter, SubscriptionClient};
use monitor_infrastructure::{
    MonitorMetrics, RedisCoordinationStore, RedisErrorReporter, RedisSubscriber,
};

async fn start_redis() -> Result<(ContainerAsync<Redis>, RedisConfig, redis::Client)> {
    let container = Redis::default().start().await?;
    let port = container.get_host_port_ipv4(6379).await?;
    let config = RedisConfig {
        address: format!("127.0.0.1:{port}"),
        ..RedisConfig::default()
    };
    let client = redis::Client::open(config.build_url())?;
    Ok((container, config, client))
}

fn task_entry(task_id: TaskId, job_id: JobId) -> Vec<u8> {
    serde_json::to_vec(&TaskTableData {
        task_spec: TaskSpec {
            task_id,
            job_id,
            function_descriptor: vec!["module".to_string(), "f".to_string()],
        },
    })
    .unwrap()
}

#[tokio::test]
#[ignore] // Ignore by default since it requires Docker
async fn test_store_reads_tables_and_deletes_keys() -> Result<()> {
    let (_container, config, client) = start_redis().await?;
    let mut conn = client.get_multiplexed_async_connection().await?;

    let node = NodeId::from([1u8; NodeId::SIZE]);
    let entry = NodeTableEntry {
        client_id: node,
        node_manager_address: "10.0.0.1".to_string(),
        aux_address: None,
        is_insertion: true,
    };
    let _: i64 = redis::cmd("RPUSH")
        .arg(NODE_TABLE_KEY)
        .arg(serde_json::to_vec(&entry)?)
        .query_async(&mut conn)
        .await?;

    let job = JobId::from([2u8; JobId::SIZE]);
    let task = TaskId::from([3u8; TaskId::SIZE]);
    let object = task.object_id(1);
    let _: () = redis::cmd("SET")
        .arg(task_key(task.binary()))
        .arg(task_entry(task, job))
        .query_async(&mut conn)
        .await?;
    let _: () = redis::cmd("SET")
        .arg(object_key(object.binary()))
        .arg("location")
        .query_async(&mut conn)
        .await?;

    let store = RedisCoordinationStore::connect(&config, MonitorMetrics::new()).await?;
    assert_eq!(store.shard_count(), 1);

    let nodes = store.read_node_table().await?;
    assert_eq!(nodes, vec![entry]);

    let tasks = store.scan_task_table().await?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_id, task);
    assert_eq!(tasks[0].job_id, job);

    let objects = store.scan_object_table().await?;
    assert_eq!(objects, vec![object]);

    let deleted = store
        .delete_keys(
            0,
            &[
                task_key(task.binary()),
                object_key(object.binary()),
                task_key(&[9u8; TaskId::SIZE]),
            ],
        )
        .await?;
    assert_eq!(deleted, 2);
    assert!(store.scan_task_table().await?.is_empty());

    assert!(store.get("gcs_flushing_policy").await?.is_none());
    assert!(store.used_memory().await? > 0);

    Ok(())
}

#[tokio::test]
#[ignore] // Ignore by default since it requires Docker
async fn test_flush_command_unsupported_on_plain_redis() -> Result<()> {
    let (_container, config, _client) = start_redis().await?;
    let store = RedisCoordinationStore::connect(&config, MonitorMetrics::new()).await?;

    assert!(store.flush_shard(0).await.is_err());
    Ok(())
}

#[tokio::test]
#[ignore] // Ignore by default since it requires Docker
async fn test_subscriber_polls_without_blocking() -> Result<()> {
    let (_container, config, client) = start_redis().await?;
    let mut subscriber = RedisSubscriber::subscribe(&config, "JOB").await?;
    assert_eq!(subscriber.channel(), "JOB");
    assert!(subscriber.poll_message().await?.is_none());

    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: i64 = redis::cmd("PUBLISH")
        .arg("JOB")
        .arg("payload")
        .query_async(&mut conn)
        .await?;

    let mut received = None;
    for _ in 0..50 {
        if let Some(message) = subscriber.poll_message().await? {
            received = Some(message);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let message = received.expect("message should arrive");
    assert_eq!(message.channel, "JOB");
    assert_eq!(message.payload, b"payload".to_vec());
    Ok(())
}

#[tokio::test]
#[ignore] // Ignore by default since it requires Docker
async fn test_error_reporter_pushes_to_error_table() -> Result<()> {
    let (_container, config, client) = start_redis().await?;
    let reporter = RedisErrorReporter::connect(&config, "ERROR_INFO").await?;

    let error = ErrorTableData::broadcast(MONITOR_DIED_ERROR, "boom".to_string());
    reporter.push_error(&error).await?;

    let mut conn = client.get_multiplexed_async_connection().await?;
    let key = format!("{}{}", ERROR_INFO_PREFIX, JobId::nil().hex());
    let stored: Vec<Vec<u8>> = redis::cmd("LRANGE")
        .arg(&key)
        .arg(0)
        .arg(-1)
        .query_async(&mut conn)
        .await?;
    assert_eq!(stored.len(), 1);

    let decoded: ErrorTableData = serde_json::from_slice(&stored[0])?;
    assert_eq!(decoded.error_type, "monitor_died");
    assert_eq!(decoded.error_message, "boom");
    Ok(())
}
