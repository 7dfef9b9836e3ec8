//! In-memory implementations of the monitor's external boundaries
//!
//! Every double is cheaply cloneable and shares its state, so a test can keep
//! a handle for assertions after moving a clone into the component under test.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use monitor_core::models::tables::{object_key, task_key, OBJECT_TABLE_PREFIX, TASK_TABLE_PREFIX};
use monitor_core::models::{
    ErrorTableData, NodeTableEntry, ObjectId, ResourceVector, TaskRecord, TaskTableData,
};
use monitor_core::{
    route, Autoscaler, ChannelMessage, CoordinationStore, ErrorReporter, FlushPolicy,
    LoadMetrics, LoadMetricsSink, MonitorError, MonitorResult, ShardIndex, SubscriptionClient,
};

#[derive(Debug, Default)]
struct StoreState {
    shards: Vec<BTreeMap<Vec<u8>, Vec<u8>>>,
    node_log: Vec<NodeTableEntry>,
    primary: HashMap<String, Vec<u8>>,
    event_log_keys: u64,
    flush_supported: bool,
    flush_calls: Vec<u64>,
    delete_calls: Vec<(ShardIndex, usize)>,
    failing_shards: HashSet<ShardIndex>,
    fail_node_table: bool,
    fail_scans: bool,
    used_memory: u64,
}

/// Mock implementation of CoordinationStore for testing
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new(shard_count: usize) -> Self {
        assert!(shard_count > 0, "store needs at least one shard");
        Self {
            state: Arc::new(Mutex::new(StoreState {
                shards: vec![BTreeMap::new(); shard_count],
                ..StoreState::default()
            })),
        }
    }

    /// 按任务ID路由写入任务表条目，返回所在分片
    pub fn insert_task(&self, data: &TaskTableData) -> ShardIndex {
        let task_id = data.task_spec.task_id;
        let value = serde_json::to_vec(data).unwrap();
        let mut state = self.state.lock().unwrap();
        let shard = route(task_id.binary(), state.shards.len());
        state.shards[shard].insert(task_key(task_id.binary()), value);
        shard
    }

    /// 按对象ID路由写入对象表条目，返回所在分片
    pub fn insert_object(&self, object_id: &ObjectId) -> ShardIndex {
        let mut state = self.state.lock().unwrap();
        let shard = route(object_id.binary(), state.shards.len());
        state.shards[shard].insert(object_key(object_id.binary()), b"location".to_vec());
        shard
    }

    pub fn push_node_entry(&self, entry: NodeTableEntry) {
        self.state.lock().unwrap().node_log.push(entry);
    }

    pub fn set_primary(&self, key: &str, value: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .primary
            .insert(key.to_string(), value);
    }

    pub fn set_flush_supported(&self, supported: bool) {
        self.state.lock().unwrap().flush_supported = supported;
    }

    pub fn set_event_log_keys(&self, count: u64) {
        self.state.lock().unwrap().event_log_keys = count;
    }

    pub fn set_used_memory(&self, bytes: u64) {
        self.state.lock().unwrap().used_memory = bytes;
    }

    pub fn fail_shard(&self, shard: ShardIndex) {
        self.state.lock().unwrap().failing_shards.insert(shard);
    }

    pub fn set_node_table_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_node_table = fail;
    }

    pub fn set_scan_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_scans = fail;
    }

    pub fn contains_key(&self, shard: ShardIndex, key: &[u8]) -> bool {
        self.state.lock().unwrap().shards[shard].contains_key(key)
    }

    pub fn keys_on_shard(&self, shard: ShardIndex) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().shards[shard]
            .keys()
            .cloned()
            .collect()
    }

    pub fn total_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .shards
            .iter()
            .map(BTreeMap::len)
            .sum()
    }

    pub fn flush_calls(&self) -> Vec<u64> {
        self.state.lock().unwrap().flush_calls.clone()
    }

    /// 每次批量删除的 (分片, 请求键数)
    pub fn delete_calls(&self) -> Vec<(ShardIndex, usize)> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn event_log_keys(&self) -> u64 {
        self.state.lock().unwrap().event_log_keys
    }
}

#[async_trait]
impl CoordinationStore for InMemoryStore {
    fn shard_count(&self) -> usize {
        self.state.lock().unwrap().shards.len()
    }

    async fn read_node_table(&self) -> MonitorResult<Vec<NodeTableEntry>> {
        let state = self.state.lock().unwrap();
        if state.fail_node_table {
            return Err(MonitorError::Store("node table unavailable".to_string()));
        }
        Ok(state.node_log.clone())
    }

    async fn scan_task_table(&self) -> MonitorResult<Vec<TaskRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_scans {
            return Err(MonitorError::Store("task table scan failed".to_string()));
        }
        let mut records = Vec::new();
        for shard in &state.shards {
            for (key, value) in shard {
                if key.starts_with(TASK_TABLE_PREFIX) {
                    let data: TaskTableData = serde_json::from_slice(value)?;
                    records.push(TaskRecord::from(data));
                }
            }
        }
        Ok(records)
    }

    async fn scan_object_table(&self) -> MonitorResult<Vec<ObjectId>> {
        let state = self.state.lock().unwrap();
        if state.fail_scans {
            return Err(MonitorError::Store("object table scan failed".to_string()));
        }
        let mut objects = Vec::new();
        for shard in &state.shards {
            for key in shard.keys() {
                if let Some(raw) = key.strip_prefix(OBJECT_TABLE_PREFIX) {
                    objects.push(ObjectId::from_binary(raw)?);
                }
            }
        }
        Ok(objects)
    }

    async fn delete_keys(&self, shard: ShardIndex, keys: &[Vec<u8>]) -> MonitorResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push((shard, keys.len()));
        if state.failing_shards.contains(&shard) {
            return Err(MonitorError::ShardUnavailable {
                shard,
                message: "connection refused".to_string(),
            });
        }
        let table = state
            .shards
            .get_mut(shard)
            .ok_or_else(|| MonitorError::Internal(format!("no shard {shard}")))?;
        let deleted = keys.iter().filter(|key| table.remove(*key).is_some()).count();
        Ok(deleted as u64)
    }

    async fn get(&self, key: &str) -> MonitorResult<Option<Vec<u8>>> {
        Ok(self.state.lock().unwrap().primary.get(key).cloned())
    }

    async fn flush_shard(&self, max_entries: u64) -> MonitorResult<i64> {
        let mut state = self.state.lock().unwrap();
        if !state.flush_supported {
            return Err(MonitorError::ShardUnavailable {
                shard: 0,
                message: "ERR unknown command 'HEAD.FLUSH'".to_string(),
            });
        }
        state.flush_calls.push(max_entries);
        Ok(max_entries as i64)
    }

    async fn used_memory(&self) -> MonitorResult<u64> {
        Ok(self.state.lock().unwrap().used_memory)
    }

    async fn flush_event_logs(&self) -> MonitorResult<u64> {
        let mut state = self.state.lock().unwrap();
        Ok(std::mem::take(&mut state.event_log_keys))
    }
}

/// 测试侧向订阅队列投递消息的句柄
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    channel: String,
    queue: Arc<Mutex<VecDeque<ChannelMessage>>>,
    polls: Arc<Mutex<usize>>,
    closed: Arc<Mutex<bool>>,
}

impl SubscriberHandle {
    pub fn push(&self, payload: Vec<u8>) {
        let message = ChannelMessage::new(self.channel.clone(), payload);
        self.queue.lock().unwrap().push_back(message);
    }

    /// 投递一条声称来自其他频道的消息
    pub fn push_on(&self, channel: &str, payload: Vec<u8>) {
        let message = ChannelMessage::new(channel, payload);
        self.queue.lock().unwrap().push_back(message);
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn polls(&self) -> usize {
        *self.polls.lock().unwrap()
    }

    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

/// Mock implementation of SubscriptionClient for testing
#[derive(Debug)]
pub struct ScriptedSubscriber {
    handle: SubscriberHandle,
}

impl ScriptedSubscriber {
    pub fn new(channel: &str) -> (Self, SubscriberHandle) {
        let handle = SubscriberHandle {
            channel: channel.to_string(),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            polls: Arc::new(Mutex::new(0)),
            closed: Arc::new(Mutex::new(false)),
        };
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

#[async_trait]
impl SubscriptionClient for ScriptedSubscriber {
    fn channel(&self) -> &str {
        &self.handle.channel
    }

    async fn poll_message(&mut self) -> MonitorResult<Option<ChannelMessage>> {
        *self.handle.polls.lock().unwrap() += 1;
        if *self.handle.closed.lock().unwrap() {
            return Err(MonitorError::Store(format!(
                "subscription to {} closed",
                self.handle.channel
            )));
        }
        Ok(self.handle.queue.lock().unwrap().pop_front())
    }
}

#[derive(Debug, Default)]
struct AutoscalerState {
    updates: usize,
    kills: usize,
    last_num_nodes: usize,
    fail_updates: bool,
}

/// Mock implementation of Autoscaler for testing
#[derive(Debug, Clone, Default)]
pub struct RecordingAutoscaler {
    state: Arc<Mutex<AutoscalerState>>,
}

impl RecordingAutoscaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_update_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_updates = fail;
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    pub fn kills(&self) -> usize {
        self.state.lock().unwrap().kills
    }

    pub fn last_num_nodes(&self) -> usize {
        self.state.lock().unwrap().last_num_nodes
    }
}

#[async_trait]
impl Autoscaler for RecordingAutoscaler {
    async fn update(&mut self, load_metrics: &LoadMetrics) -> MonitorResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_updates {
            return Err(MonitorError::Autoscaler("update rejected".to_string()));
        }
        state.updates += 1;
        state.last_num_nodes = load_metrics.num_workers_connected();
        Ok(())
    }

    async fn kill_workers(&mut self) -> MonitorResult<()> {
        self.state.lock().unwrap().kills += 1;
        Ok(())
    }
}

/// 记录写入的 (地址, 总量, 可用量)
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    updates: Arc<Mutex<Vec<(String, ResourceVector, ResourceVector)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(String, ResourceVector, ResourceVector)> {
        self.updates.lock().unwrap().clone()
    }
}

impl LoadMetricsSink for RecordingSink {
    fn update(&mut self, address: &str, total: ResourceVector, available: ResourceVector) {
        self.updates
            .lock()
            .unwrap()
            .push((address.to_string(), total, available));
    }
}

/// Mock implementation of ErrorReporter for testing
#[derive(Debug, Clone, Default)]
pub struct RecordingErrorReporter {
    errors: Arc<Mutex<Vec<ErrorTableData>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failure(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn errors(&self) -> Vec<ErrorTableData> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorReporter for RecordingErrorReporter {
    async fn push_error(&self, error: &ErrorTableData) -> MonitorResult<()> {
        if *self.fail.lock().unwrap() {
            return Err(MonitorError::Store("error table unavailable".to_string()));
        }
        self.errors.lock().unwrap().push(error.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PolicyState {
    should_flush: bool,
    num_entries: u64,
    records: usize,
    checks: usize,
}

/// Mock implementation of FlushPolicy for testing
#[derive(Debug, Clone, Default)]
pub struct ScriptedFlushPolicy {
    state: Arc<Mutex<PolicyState>>,
}

impl ScriptedFlushPolicy {
    pub fn new(should_flush: bool, num_entries: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(PolicyState {
                should_flush,
                num_entries,
                ..PolicyState::default()
            })),
        }
    }

    pub fn set_should_flush(&self, should_flush: bool) {
        self.state.lock().unwrap().should_flush = should_flush;
    }

    pub fn records(&self) -> usize {
        self.state.lock().unwrap().records
    }

    pub fn checks(&self) -> usize {
        self.state.lock().unwrap().checks
    }
}

#[async_trait]
impl FlushPolicy for ScriptedFlushPolicy {
    async fn should_flush(&self, _store: &dyn CoordinationStore) -> MonitorResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.checks += 1;
        Ok(state.should_flush)
    }

    fn num_entries_to_flush(&self) -> u64 {
        self.state.lock().unwrap().num_entries
    }

    fn record_flush(&mut self) {
        self.state.lock().unwrap().records += 1;
    }
}
