use async_trait::async_trait;

use crate::traits::store::CoordinationStore;
use crate::MonitorResult;

/// GCS 刷新策略能力接口，节流与退避状态由策略自身持有
#[async_trait]
pub trait FlushPolicy: Send + Sync {
    async fn should_flush(&self, store: &dyn CoordinationStore) -> MonitorResult<bool>;

    fn num_entries_to_flush(&self) -> u64;

    fn record_flush(&mut self);
}
