use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{MonitorError, MonitorResult};

/// 表变更模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GcsChangeMode {
    #[default]
    AppendOrAdd,
    Remove,
}

/// 发布订阅通知的外层信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcsEntry<T> {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub change_mode: GcsChangeMode,
    pub entries: Vec<T>,
}

impl<T> GcsEntry<T> {
    pub fn single(id: impl Into<String>, entry: T) -> Self {
        Self {
            id: id.into(),
            change_mode: GcsChangeMode::AppendOrAdd,
            entries: vec![entry],
        }
    }
}

impl<T: DeserializeOwned> GcsEntry<T> {
    pub fn decode(payload: &[u8]) -> MonitorResult<Self> {
        serde_json::from_slice(payload).map_err(|e| {
            MonitorError::Decode(format!(
                "failed to decode {} notification: {e}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// 解码信封并取出第一条记录；信封为空视为解码错误
    pub fn decode_first(payload: &[u8]) -> MonitorResult<T> {
        let entry = Self::decode(payload)?;
        entry.entries.into_iter().next().ok_or_else(|| {
            MonitorError::Decode(format!(
                "{} notification carries no entries",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl<T: Serialize> GcsEntry<T> {
    pub fn encode(&self) -> MonitorResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobId, JobTableData};

    #[test]
    fn test_decode_first_entry() {
        let job = JobTableData {
            job_id: JobId::from([4u8; JobId::SIZE]),
            is_dead: true,
            timestamp: 1,
            node_manager_address: "10.0.0.1".to_string(),
            driver_pid: 42,
        };
        let payload = GcsEntry::single(job.job_id.hex(), job.clone())
            .encode()
            .unwrap();

        let decoded = GcsEntry::<JobTableData>::decode_first(&payload).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_empty_envelope_is_decode_error() {
        let payload = br#"{"id":"","entries":[]}"#;
        let err = GcsEntry::<JobTableData>::decode_first(payload).unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_garbage_payload_is_decode_error() {
        let err = GcsEntry::<JobTableData>::decode_first(b"\x00\x01not json").unwrap_err();
        assert!(matches!(err, MonitorError::Decode(_)));
    }
}
