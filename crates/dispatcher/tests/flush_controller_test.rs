use monitor_core::config::GcsFlushConfig;
use monitor_core::policies::{FlushPolicyConfig, SimpleFlushPolicyConfig};
use monitor_core::FlushPolicy;
use monitor_dispatcher::{FlushController, FlushState};
use monitor_infrastructure::MonitorMetrics;
use monitor_testing_utils::*;

const POLICY_KEY: &str = "gcs_flushing_policy";

fn enabled() -> GcsFlushConfig {
    GcsFlushConfig {
        enabled: true,
        ..GcsFlushConfig::default()
    }
}

fn flush_capable_store() -> InMemoryStore {
    let store = InMemoryStore::new(1);
    store.set_flush_supported(true);
    store
}

async fn scripted_controller(
    store: &InMemoryStore,
    policy: &ScriptedFlushPolicy,
) -> FlushController {
    let policy = policy.clone();
    FlushController::new(&enabled(), store, MonitorMetrics::new())
        .await
        .with_decoder(Box::new(move |_: &[u8]| {
            Ok(Box::new(policy.clone()) as Box<dyn FlushPolicy>)
        }))
}

#[tokio::test]
async fn test_disabled_flag_never_flushes() {
    let store = flush_capable_store();
    store.set_primary(POLICY_KEY, b"policy".to_vec());
    let mut controller =
        FlushController::new(&GcsFlushConfig::default(), &store, MonitorMetrics::new()).await;

    for _ in 0..10 {
        assert_eq!(controller.maybe_flush(&store).await.unwrap(), None);
    }

    assert!(!controller.is_enabled());
    assert!(store.flush_calls().is_empty());
}

#[tokio::test]
async fn test_multi_shard_deployment_disables_flushing() {
    let store = InMemoryStore::new(2);
    store.set_flush_supported(true);

    let controller = FlushController::new(&enabled(), &store, MonitorMetrics::new()).await;

    assert!(matches!(controller.state(), FlushState::Disabled));
    assert!(store.flush_calls().is_empty());
}

#[tokio::test]
async fn test_failed_probe_disables_flushing() {
    let store = InMemoryStore::new(1);
    store.set_primary(POLICY_KEY, b"policy".to_vec());

    let mut controller = FlushController::new(&enabled(), &store, MonitorMetrics::new()).await;
    assert!(!controller.is_enabled());

    store.set_flush_supported(true);
    assert_eq!(controller.maybe_flush(&store).await.unwrap(), None);
    assert!(store.flush_calls().is_empty());
}

#[tokio::test]
async fn test_probe_success_waits_for_policy() {
    let store = flush_capable_store();
    let controller = FlushController::new(&enabled(), &store, MonitorMetrics::new()).await;

    assert!(matches!(controller.state(), FlushState::PolicyUnset));
    assert_eq!(store.flush_calls(), vec![0]);
}

#[tokio::test]
async fn test_missing_policy_disables_for_good() {
    let store = flush_capable_store();
    let policy = ScriptedFlushPolicy::new(true, 100);
    let mut controller = scripted_controller(&store, &policy).await;

    assert_eq!(controller.maybe_flush(&store).await.unwrap(), None);
    assert!(matches!(controller.state(), FlushState::Disabled));

    store.set_primary(POLICY_KEY, b"late".to_vec());
    assert_eq!(controller.maybe_flush(&store).await.unwrap(), None);
    assert_eq!(policy.checks(), 0);
    assert_eq!(store.flush_calls(), vec![0]);
}

#[tokio::test]
async fn test_loaded_policy_drives_flush() {
    let store = flush_capable_store();
    store.set_primary(POLICY_KEY, b"policy".to_vec());
    store.set_event_log_keys(4);
    let policy = ScriptedFlushPolicy::new(true, 100);
    let mut controller = scripted_controller(&store, &policy).await;

    let flushed = controller.maybe_flush(&store).await.unwrap();

    assert_eq!(flushed, Some(100));
    assert!(matches!(controller.state(), FlushState::PolicyLoaded(_)));
    assert_eq!(store.flush_calls(), vec![0, 100]);
    assert_eq!(store.event_log_keys(), 0);
    assert_eq!(policy.records(), 1);
}

#[tokio::test]
async fn test_policy_declining_skips_flush() {
    let store = flush_capable_store();
    store.set_primary(POLICY_KEY, b"policy".to_vec());
    let policy = ScriptedFlushPolicy::new(false, 100);
    let mut controller = scripted_controller(&store, &policy).await;

    for _ in 0..3 {
        assert_eq!(controller.maybe_flush(&store).await.unwrap(), None);
    }

    assert_eq!(policy.checks(), 3);
    assert_eq!(policy.records(), 0);
    assert_eq!(store.flush_calls(), vec![0]);

    policy.set_should_flush(true);
    assert_eq!(controller.maybe_flush(&store).await.unwrap(), Some(100));
}

#[tokio::test]
async fn test_builtin_policy_from_store() {
    let store = flush_capable_store();
    let config = FlushPolicyConfig::Simple(SimpleFlushPolicyConfig {
        flush_when_at_least_bytes: 1024,
        flush_period_secs: 0,
        flush_num_entries_each_time: 5,
    });
    store.set_primary(POLICY_KEY, config.encode().unwrap());
    let mut controller = FlushController::new(&enabled(), &store, MonitorMetrics::new()).await;

    store.set_used_memory(10);
    assert_eq!(controller.maybe_flush(&store).await.unwrap(), None);

    store.set_used_memory(4096);
    assert_eq!(controller.maybe_flush(&store).await.unwrap(), Some(5));
    assert_eq!(store.flush_calls(), vec![0, 5]);
}

#[tokio::test]
async fn test_malformed_policy_is_an_error() {
    let store = flush_capable_store();
    store.set_primary(POLICY_KEY, b"\x80\x04not json".to_vec());
    let mut controller = FlushController::new(&enabled(), &store, MonitorMetrics::new()).await;

    assert!(controller.maybe_flush(&store).await.is_err());
}
