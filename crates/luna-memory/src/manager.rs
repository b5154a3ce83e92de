//! 记忆管理器
//!
//! 统一近期记忆与向量索引的查询入口。写入时先写近期记忆，再尽力镜像到向量索引；
//! 两者之间不保证一致，一方失败不会回滚另一方。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use luna_core::{ChatTurn, MemoryConfig, Result, Role};

use crate::index::{EmbeddingIndex, EmbeddingRecord, IndexStats};
use crate::store::{RecencyStats, RecencyStore};
use crate::types::{KIND_CONVERSATION, KIND_FACT, MemoryRecord};

/// 对话记忆的默认重要性
const CONVERSATION_IMPORTANCE: f64 = 0.7;
/// 对话上下文最多包含的条数
const MAX_CONTEXT_ENTRIES: usize = 3;

const USER_PREFIX: &str = "User: ";
const AI_SEPARATOR: &str = "\nAI: ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryStats {
    #[serde(flatten)]
    pub recency: RecencyStats,
    pub vector_memory_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_memory: Option<IndexStats>,
}

impl From<&EmbeddingRecord> for MemoryRecord {
    fn from(record: &EmbeddingRecord) -> Self {
        let mut memory = MemoryRecord::new(
            record.content.clone(),
            record.kind.clone(),
            record.emotional_context.clone(),
            record.importance,
        )
        .with_metadata(record.metadata.clone());
        memory.timestamp = record.timestamp;
        memory
    }
}

pub struct MemoryManager {
    store: RecencyStore,
    index: Option<EmbeddingIndex>,
    config: MemoryConfig,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig) -> Self {
        let index = if config.semantic_search_enabled {
            let index = EmbeddingIndex::open(&config.vector_db_path);
            info!("Vector memory initialized");
            Some(index)
        } else {
            None
        };

        info!("Initialized memory manager (max {} memories)", config.max_memories);
        Self {
            store: RecencyStore::new(config.max_memories),
            index,
            config,
        }
    }

    /// 使用外部构造的向量索引，例如自定义嵌入实现
    pub fn with_index(mut self, index: EmbeddingIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn store(&self) -> &RecencyStore {
        &self.store
    }

    pub fn index(&self) -> Option<&EmbeddingIndex> {
        self.index.as_ref()
    }

    pub fn semantic_enabled(&self) -> bool {
        self.index.is_some()
    }

    /// 写入记忆，返回近期记忆中的位置 ID
    pub fn add_memory(&mut self, record: MemoryRecord) -> String {
        let memory_id = self.store.add(record.clone());

        if let Some(index) = self.index.as_mut() {
            index.add(
                &record.content,
                &record.kind,
                &record.emotional_context,
                record.importance,
                record.metadata,
            );
        }

        memory_id
    }

    /// 用向量索引中已落盘的记录回填近期记忆（不会再次写入索引），返回回填条数
    pub fn restore_from_index(&mut self) -> usize {
        let Some(index) = &self.index else {
            return 0;
        };

        let records: Vec<MemoryRecord> = index.records().iter().map(MemoryRecord::from).collect();
        let restored = records.len();
        for record in records {
            self.store.add(record);
        }
        info!("Restored {} memories from vector index", restored);
        restored
    }

    pub fn add_conversation_memory(
        &mut self,
        user_input: &str,
        ai_response: &str,
        emotional_context: &str,
    ) -> String {
        let content = format!("{}{}{}{}", USER_PREFIX, user_input, AI_SEPARATOR, ai_response);
        self.add_memory(MemoryRecord::new(
            content,
            KIND_CONVERSATION,
            emotional_context,
            CONVERSATION_IMPORTANCE,
        ))
    }

    pub fn add_user_fact(&mut self, fact: &str, emotional_context: &str, importance: f64) -> String {
        self.add_memory(MemoryRecord::new(
            format!("User fact: {}", fact),
            KIND_FACT,
            emotional_context,
            importance,
        ))
    }

    pub fn recent(&self, limit: usize) -> Vec<MemoryRecord> {
        self.store.recent(limit)
    }

    /// 检索记忆：启用向量索引且 `use_semantic` 时走语义检索，否则走关键词检索
    pub fn search(&self, query: &str, limit: usize, use_semantic: bool) -> Vec<MemoryRecord> {
        match (&self.index, use_semantic) {
            (Some(index), true) => {
                let mut results: Vec<MemoryRecord> = index
                    .semantic_search(query, limit * 2, None)
                    .iter()
                    .map(|m| MemoryRecord::from(&m.record))
                    .collect();
                results.truncate(limit);
                results
            }
            _ => self.store.search_basic(query, limit),
        }
    }

    pub fn semantic_search(&self, query: &str, limit: usize) -> Vec<MemoryRecord> {
        self.search(query, limit, true)
    }

    pub fn search_by_emotion(&self, emotion: &str, limit: usize) -> Vec<MemoryRecord> {
        self.store.search_by_emotion(emotion, limit)
    }

    /// 最近对话记忆拼成的上下文，按时间正序
    pub fn conversation_context(&self, limit: usize) -> String {
        let mut parts: Vec<String> = self
            .store
            .recent(limit)
            .into_iter()
            .filter(MemoryRecord::is_conversation)
            .take(MAX_CONTEXT_ENTRIES)
            .map(|record| record.content)
            .collect();
        parts.reverse();
        parts.join("\n")
    }

    /// 与查询语义相关的记忆上下文；未启用向量索引时退回对话上下文
    pub fn semantic_context(&self, query: &str, limit: usize) -> String {
        let Some(index) = &self.index else {
            return self.conversation_context(limit);
        };

        index
            .semantic_search(query, limit, None)
            .into_iter()
            .map(|m| m.record.content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 还原为消息格式的对话历史，按时间正序
    pub fn conversation_history(&self, limit: usize) -> Vec<ChatTurn> {
        let mut turns = Vec::new();

        for record in self.store.recent(limit).iter().rev() {
            if !record.is_conversation() || !record.content.contains(USER_PREFIX.trim_end()) {
                continue;
            }
            let parts: Vec<&str> = record.content.split(AI_SEPARATOR).collect();
            if let [user, assistant] = parts.as_slice() {
                let user = user.replace(USER_PREFIX, "");
                turns.push(ChatTurn::new(Role::User, user, record.timestamp));
                turns.push(ChatTurn::new(Role::Assistant, *assistant, record.timestamp));
            }
        }

        turns.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let keep = limit.saturating_mul(2);
        if turns.len() > keep {
            turns.drain(..turns.len() - keep);
        }
        turns
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            recency: self.store.stats(),
            vector_memory_enabled: self.index.is_some(),
            vector_memory: self.index.as_ref().map(EmbeddingIndex::stats),
        }
    }

    /// 将向量索引写盘，关闭前调用
    pub fn save(&self) -> Result<()> {
        if let Some(index) = &self.index {
            index.save()?;
            debug!("Vector memory flushed");
        }
        Ok(())
    }
}
