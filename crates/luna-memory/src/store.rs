//! 近期记忆存储
//!
//! 有界的进程内列表。容量满时先淘汰重要性最低的记忆，重要性相同时先淘汰
//! 较早插入的；幸存记忆保持插入顺序。不做持久化。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::MemoryRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecencyStats {
    pub total_memories: usize,
    pub memory_types: BTreeMap<String, usize>,
    pub oldest_memory: Option<DateTime<Utc>>,
    pub newest_memory: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RecencyStore {
    records: Vec<MemoryRecord>,
    max_memories: usize,
}

impl RecencyStore {
    pub fn new(max_memories: usize) -> Self {
        Self {
            records: Vec::new(),
            max_memories,
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_memories
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.iter()
    }

    /// 添加记忆，返回位置 ID `memory_{n}`
    pub fn add(&mut self, record: MemoryRecord) -> String {
        while !self.records.is_empty() && self.records.len() >= self.max_memories {
            let index = self.least_important();
            let evicted = self.records.remove(index);
            debug!(
                "Evicted memory with importance {:.2}: {}",
                evicted.importance, evicted.kind
            );
        }

        self.records.push(record);
        let memory_id = format!("memory_{}", self.records.len());
        debug!("Added memory: {}", memory_id);
        memory_id
    }

    fn least_important(&self) -> usize {
        self.records
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.importance.total_cmp(&b.importance))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    /// 最近的记忆，按时间倒序；时间相同时后插入的在前
    pub fn recent(&self, limit: usize) -> Vec<MemoryRecord> {
        let mut records: Vec<&MemoryRecord> = self.records.iter().rev().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.into_iter().take(limit).cloned().collect()
    }

    /// 关键词检索：内容或任一标签包含查询串（忽略大小写）
    ///
    /// 排序键依次为：内容是否包含查询串、重要性、时间，均为降序。
    pub fn search_basic(&self, query: &str, limit: usize) -> Vec<MemoryRecord> {
        let query = query.to_lowercase();

        let mut matches: Vec<(bool, &MemoryRecord)> = self
            .records
            .iter()
            .filter_map(|record| {
                let in_content = record.content.to_lowercase().contains(&query);
                let in_tags = record
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&query));
                (in_content || in_tags).then_some((in_content, record))
            })
            .collect();

        matches.sort_by(|(a_content, a), (b_content, b)| {
            b_content
                .cmp(a_content)
                .then_with(|| b.importance.total_cmp(&a.importance))
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });

        matches
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// 按情绪标签检索，保持插入顺序
    pub fn search_by_emotion(&self, emotion: &str, limit: usize) -> Vec<MemoryRecord> {
        let emotion = emotion.to_lowercase();
        self.records
            .iter()
            .filter(|record| record.emotional_context.to_lowercase().contains(&emotion))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> RecencyStats {
        let mut memory_types = BTreeMap::new();
        for record in &self.records {
            *memory_types.entry(record.kind.clone()).or_insert(0) += 1;
        }

        RecencyStats {
            total_memories: self.records.len(),
            memory_types,
            oldest_memory: self.records.iter().map(|r| r.timestamp).min(),
            newest_memory: self.records.iter().map(|r| r.timestamp).max(),
        }
    }
}

impl Default for RecencyStore {
    fn default() -> Self {
        Self::new(1000)
    }
}
