use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{MonitorError, MonitorResult};
use crate::shard::murmur_hash_64a;

/// 任务ID字节长度
pub const TASK_ID_SIZE: usize = 16;
/// 对象ID字节长度：任务ID + 4字节小端序返回值索引
pub const OBJECT_ID_SIZE: usize = TASK_ID_SIZE + 4;
/// 节点ID字节长度
pub const NODE_ID_SIZE: usize = 20;
/// 作业ID字节长度
pub const JOB_ID_SIZE: usize = 16;

macro_rules! fixed_width_id {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $size]);

        impl $name {
            pub const SIZE: usize = $size;

            pub fn from_binary(bytes: &[u8]) -> MonitorResult<Self> {
                let raw: [u8; $size] = bytes.try_into().map_err(|_| {
                    MonitorError::InvalidId(format!(
                        "{} requires {} bytes, got {}",
                        stringify!($name),
                        $size,
                        bytes.len()
                    ))
                })?;
                Ok(Self(raw))
            }

            pub fn from_hex(hex_str: &str) -> MonitorResult<Self> {
                let bytes = hex::decode(hex_str).map_err(|e| {
                    MonitorError::InvalidId(format!(
                        "{} is not valid hex ({}): {e}",
                        stringify!($name),
                        hex_str
                    ))
                })?;
                Self::from_binary(&bytes)
            }

            pub fn nil() -> Self {
                Self([0xff; $size])
            }

            pub fn binary(&self) -> &[u8] {
                &self.0
            }

            pub fn hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(raw: [u8; $size]) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let hex_str = String::deserialize(deserializer)?;
                Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_width_id!(
    /// 集群节点标识，在节点生命周期内唯一
    NodeId,
    NODE_ID_SIZE
);
fixed_width_id!(
    /// 已结束作业（driver）的标识
    JobId,
    JOB_ID_SIZE
);
fixed_width_id!(TaskId, TASK_ID_SIZE);
fixed_width_id!(
    /// 对象标识，前缀即产生该对象的任务ID
    ObjectId,
    OBJECT_ID_SIZE
);

impl TaskId {
    pub fn redis_shard_hash(&self) -> u64 {
        murmur_hash_64a(&self.0, 0)
    }

    /// 该任务第 `index` 个返回值对应的对象ID
    pub fn object_id(&self, index: u32) -> ObjectId {
        let mut raw = [0u8; OBJECT_ID_SIZE];
        raw[..TASK_ID_SIZE].copy_from_slice(&self.0);
        raw[TASK_ID_SIZE..].copy_from_slice(&index.to_le_bytes());
        ObjectId(raw)
    }
}

impl ObjectId {
    pub fn redis_shard_hash(&self) -> u64 {
        murmur_hash_64a(&self.0, 0)
    }

    /// 纯函数推导：对象ID → 产生它的任务ID
    pub fn task_id(&self) -> TaskId {
        let mut raw = [0u8; TASK_ID_SIZE];
        raw.copy_from_slice(&self.0[..TASK_ID_SIZE]);
        TaskId(raw)
    }

    pub fn index(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[TASK_ID_SIZE..]);
        u32::from_le_bytes(raw)
    }
}
