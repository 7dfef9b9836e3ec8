//! 分片路由
//!
//! 标识符按 MurmurHash64A 取模映射到固定数量的存储分片。任务ID与对象ID宽度不同，
//! 路由时按长度区分，并由各自的ID类型计算哈希。

use crate::models::{ObjectId, TaskId, OBJECT_ID_SIZE, TASK_ID_SIZE};

/// 分片下标，取值范围 `[0, shard_count)`
pub type ShardIndex = usize;

/// 按字节长度识别的标识符种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Task,
    Object,
    Other,
}

impl IdKind {
    pub fn of(id: &[u8]) -> Self {
        match id.len() {
            TASK_ID_SIZE => IdKind::Task,
            OBJECT_ID_SIZE => IdKind::Object,
            _ => IdKind::Other,
        }
    }
}

/// 将标识符路由到分片
///
/// # Panics
///
/// 空标识符或分片数为0属于调用方的编程错误。
pub fn route(id: &[u8], shard_count: usize) -> ShardIndex {
    assert!(!id.is_empty(), "cannot route an empty identifier");
    assert!(shard_count > 0, "shard count must be positive");

    let hash = match IdKind::of(id) {
        IdKind::Task => TaskId::from_binary(id).map(|task_id| task_id.redis_shard_hash()),
        IdKind::Object => ObjectId::from_binary(id).map(|object_id| object_id.redis_shard_hash()),
        IdKind::Other => Ok(murmur_hash_64a(id, 0)),
    }
    .unwrap_or_else(|_| murmur_hash_64a(id, 0));

    (hash % shard_count as u64) as ShardIndex
}

/// MurmurHash64A（Austin Appleby），小端序读取 8 字节块
pub fn murmur_hash_64a(key: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4_a793_5bd1_e995;
    const R: u32 = 47;

    let mut h = seed ^ (key.len() as u64).wrapping_mul(M);

    let mut blocks = key.chunks_exact(8);
    for block in &mut blocks {
        let mut word = [0u8; 8];
        word.copy_from_slice(block);
        let mut k = u64::from_le_bytes(word);

        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, byte) in tail.iter().enumerate() {
            h ^= u64::from(*byte) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}
