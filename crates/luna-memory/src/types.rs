//! 记忆类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const KIND_CONVERSATION: &str = "conversation";
pub const KIND_FACT: &str = "fact";

/// 关键词标签的最小长度（不含）
const KEYWORD_MIN_LEN: usize = 4;
/// 每条记忆最多提取的关键词数量
const MAX_KEYWORDS: usize = 5;

pub type Metadata = Map<String, Value>;

/// 记忆项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub content: String,
    /// 记忆类型，开放字符串，常见值为 `conversation` 与 `fact`
    #[serde(rename = "type")]
    pub kind: String,
    /// 情绪标签，例如 `moderately_joy`
    #[serde(default)]
    pub emotional_context: String,
    /// 重要性 (0.0 - 1.0)，不做范围校验
    pub importance: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
    /// 创建时派生，之后不再重新计算
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MemoryRecord {
    pub fn new(
        content: impl Into<String>,
        kind: impl Into<String>,
        emotional_context: impl Into<String>,
        importance: f64,
    ) -> Self {
        let content = content.into();
        let kind = kind.into();
        let emotional_context = emotional_context.into();

        let mut tags = vec![kind.clone(), emotional_context.clone()];
        tags.extend(extract_keywords(&content));
        tags.retain(|tag| !tag.is_empty());

        Self {
            content,
            kind,
            emotional_context,
            importance,
            timestamp: Utc::now(),
            metadata: Metadata::new(),
            tags,
        }
    }

    /// 默认参数的对话记忆
    pub fn conversation(content: impl Into<String>) -> Self {
        Self::new(content, KIND_CONVERSATION, "", 0.5)
    }

    pub fn fact(content: impl Into<String>, importance: f64) -> Self {
        Self::new(content, KIND_FACT, "", importance)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_conversation(&self) -> bool {
        self.kind == KIND_CONVERSATION
    }
}

/// 从内容中提取关键词：小写后长度大于 4 的前 5 个词
pub fn extract_keywords(content: &str) -> Vec<String> {
    content
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > KEYWORD_MIN_LEN)
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_derived_from_content() {
        let record = MemoryRecord::new(
            "My favourite programming language is Rust, truly wonderful stuff",
            KIND_FACT,
            "happy",
            0.8,
        );
        assert_eq!(
            record.tags,
            vec!["fact", "happy", "favourite", "programming", "language", "rust,", "truly"]
        );
    }

    #[test]
    fn test_empty_tags_filtered() {
        let record = MemoryRecord::conversation("hi you ok");
        assert_eq!(record.tags, vec!["conversation"]);
        assert_eq!(record.importance, 0.5);
        assert!(record.emotional_context.is_empty());
        assert!(record.is_conversation());
    }

    #[test]
    fn test_importance_accepted_as_is() {
        let record = MemoryRecord::new("out of range", KIND_FACT, "", 1.7);
        assert_eq!(record.importance, 1.7);
    }

    #[test]
    fn test_serialized_field_names() {
        let record = MemoryRecord::fact("User fact: likes tea", 0.8);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "fact");
        assert_eq!(json["emotional_context"], "");
        assert!(json["timestamp"].is_string());
    }
}
