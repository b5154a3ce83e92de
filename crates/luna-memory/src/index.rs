//! 向量记忆索引
//!
//! 每条记忆附带特征向量，整体以 JSON 数组写入 `{dir}/memories.json`。
//! 每次添加都会立即全量重写文件；写入不是原子的，进程在写入中途崩溃可能损坏文件，
//! 下次启动时损坏的文件先备份为 `memories.json.bak` 再按空索引处理，单条损坏的记录只跳过该条。
//! 检索是对全部记录的线性扫描。

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use luna_core::{LunaError, Result};

use crate::embedding::{BagOfWordsEmbedding, Embedding, EmbeddingProvider};
use crate::types::{Metadata, extract_keywords};

pub const INDEX_FILE_NAME: &str = "memories.json";
/// 加载时丢弃了记录，原文件先复制到这里
pub const BACKUP_FILE_NAME: &str = "memories.json.bak";

/// 不带时区的时间格式，按本地时间解释
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 解析索引文件中的时间戳：RFC 3339，或不带时区的 ISO-8601 本地时间
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }

    let naive = NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    )
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("无法解析时间戳: {}", raw)))
}

/// 带嵌入向量的记忆
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub emotional_context: String,
    pub importance: f64,
    pub embedding: Embedding,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 索引中的标签：`emotion:{label}` 加内容关键词
fn index_tags(content: &str, emotional_context: &str) -> Vec<String> {
    let mut tags = Vec::new();
    if !emotional_context.is_empty() {
        tags.push(format!("emotion:{}", emotional_context));
    }
    tags.extend(extract_keywords(content));
    tags
}

/// 语义检索结果
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub similarity: f64,
    pub record: EmbeddingRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    pub total_memories: usize,
    pub memory_types: BTreeMap<String, usize>,
    pub emotions: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_importance: Option<f64>,
    pub oldest_memory: Option<DateTime<Utc>>,
    pub newest_memory: Option<DateTime<Utc>>,
}

pub struct EmbeddingIndex {
    dir: PathBuf,
    records: Vec<EmbeddingRecord>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingIndex {
    /// 打开索引目录并加载已有记录；目录无法创建或文件损坏时从空索引开始
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::with_provider(dir, Arc::new(BagOfWordsEmbedding::new()))
    }

    pub fn with_provider(dir: impl Into<PathBuf>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        let mut index = Self {
            dir: dir.into(),
            records: Vec::new(),
            provider,
        };

        if let Err(e) = fs::create_dir_all(&index.dir) {
            error!("Error initializing vector memory at {}: {}", index.dir.display(), e);
        }
        index.load();
        info!("Vector memory initialized with {} memories", index.records.len());
        index
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub fn embed(&self, text: &str) -> Embedding {
        self.provider.embed(text)
    }

    /// 添加记忆并立即落盘，返回 `vec_mem_{n}_{epoch}`
    pub fn add(
        &mut self,
        content: &str,
        kind: &str,
        emotional_context: &str,
        importance: f64,
        metadata: Metadata,
    ) -> String {
        let now = Utc::now();
        let memory_id = format!("vec_mem_{}_{}", self.records.len(), now.timestamp());

        let record = EmbeddingRecord {
            id: memory_id.clone(),
            content: content.to_string(),
            kind: kind.to_string(),
            emotional_context: emotional_context.to_string(),
            importance,
            embedding: self.provider.embed(content),
            timestamp: now,
            metadata,
            tags: index_tags(content, emotional_context),
        };

        self.records.push(record);
        self.persist();

        debug!("Added vector memory: {}", memory_id);
        memory_id
    }

    /// 按相似度降序返回前 `limit` 条；`kinds` 非空时只检索这些类型
    pub fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        kinds: Option<&[&str]>,
    ) -> Vec<SemanticMatch> {
        if self.records.is_empty() {
            return Vec::new();
        }

        let query_embedding = self.provider.embed(query);

        let mut matches: Vec<SemanticMatch> = self
            .records
            .iter()
            .filter(|record| match kinds {
                Some(kinds) if !kinds.is_empty() => kinds.contains(&record.kind.as_str()),
                _ => true,
            })
            .map(|record| SemanticMatch {
                similarity: self.provider.similarity(&query_embedding, &record.embedding),
                record: record.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(limit);
        matches
    }

    pub fn search_by_emotion(&self, emotion: &str, limit: usize) -> Vec<EmbeddingRecord> {
        let emotion = emotion.to_lowercase();
        self.records
            .iter()
            .filter(|record| record.emotional_context.to_lowercase().contains(&emotion))
            .take(limit)
            .cloned()
            .collect()
    }

    /// 任一查询标签是任一记忆标签的子串即命中（忽略大小写）
    pub fn search_by_tags(&self, tags: &[&str], limit: usize) -> Vec<EmbeddingRecord> {
        let search_tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
        self.records
            .iter()
            .filter(|record| {
                record.tags.iter().any(|tag| {
                    let tag = tag.to_lowercase();
                    search_tags.iter().any(|search| tag.contains(search.as_str()))
                })
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<EmbeddingRecord> {
        let mut records: Vec<&EmbeddingRecord> = self.records.iter().rev().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.into_iter().take(limit).cloned().collect()
    }

    pub fn most_important(&self, limit: usize) -> Vec<EmbeddingRecord> {
        let mut records: Vec<&EmbeddingRecord> = self.records.iter().collect();
        records.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        records.into_iter().take(limit).cloned().collect()
    }

    /// 全量写入索引文件
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(self.file_path(), json).map_err(|e| {
            LunaError::Memory(format!(
                "写入向量记忆失败 {}: {}",
                self.file_path().display(),
                e
            ))
        })?;
        debug!("Saved {} memories to disk", self.records.len());
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("Error saving memories: {}", e);
        }
    }

    /// 从磁盘重新加载；文件缺失或无法解析时清空索引
    pub fn load(&mut self) {
        match self.read_file() {
            Ok(Some(records)) => {
                info!("Loaded {} memories from disk", records.len());
                self.records = records;
            }
            Ok(None) => {
                self.records.clear();
            }
            Err(e) => {
                error!("Error loading memories: {}", e);
                self.records.clear();
            }
        }
    }

    /// 逐条解析记录，无法解析的记录被跳过；有记录被丢弃时先备份原文件
    fn read_file(&self) -> Result<Option<Vec<EmbeddingRecord>>> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let entries: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                self.backup();
                return Err(e.into());
            }
        };

        let total = entries.len();
        let records: Vec<EmbeddingRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unreadable memory #{}: {}", i, e);
                    None
                }
            })
            .collect();

        if records.len() < total {
            self.backup();
        }
        Ok(Some(records))
    }

    fn backup(&self) {
        let backup = self.dir.join(BACKUP_FILE_NAME);
        match fs::copy(self.file_path(), &backup) {
            Ok(_) => warn!("Backed up memory index to {}", backup.display()),
            Err(e) => error!("Error backing up memory index: {}", e),
        }
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_memories: self.records.len(),
            ..Default::default()
        };
        if self.records.is_empty() {
            return stats;
        }

        for record in &self.records {
            *stats.memory_types.entry(record.kind.clone()).or_insert(0) += 1;
            let emotion = if record.emotional_context.is_empty() {
                "neutral".to_string()
            } else {
                record.emotional_context.clone()
            };
            *stats.emotions.entry(emotion).or_insert(0) += 1;
        }

        let total_importance: f64 = self.records.iter().map(|r| r.importance).sum();
        stats.average_importance = Some(total_importance / self.records.len() as f64);
        stats.oldest_memory = self.records.iter().map(|r| r.timestamp).min();
        stats.newest_memory = self.records.iter().map(|r| r.timestamp).max();
        stats
    }
}
