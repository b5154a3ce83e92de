//! 配置管理
//!
//! 以 JSON 文件为来源，支持 `memory.max_memories` 这样的点分路径访问，
//! 缺失的键一律回落到调用方给出的默认值。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::{LunaError, Result};

/// 校验时必须存在的顶层配置段
const REQUIRED_SECTIONS: &[&str] = &["core", "ollama", "memory", "plugins"];

/// 键值配置存储
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    values: Value,
}

impl ConfigStore {
    /// 从文件加载配置；文件不存在或无法解析时使用内置默认值
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read_file(&path) {
            Ok(Some(values)) => {
                info!("Configuration loaded from {}", path.display());
                values
            }
            Ok(None) => {
                warn!("Config file not found at {}, using defaults", path.display());
                Self::default_values()
            }
            Err(e) => {
                error!("Error loading config: {}", e);
                Self::default_values()
            }
        };
        Self { path, values }
    }

    pub fn from_value(path: impl Into<PathBuf>, values: Value) -> Self {
        Self {
            path: path.into(),
            values,
        }
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("config").join("default_config.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    fn read_file(path: &Path) -> Result<Option<Value>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| LunaError::Config(format!("读取配置失败: {}", e)))?;

        let values: Value = serde_json::from_str(&content)
            .map_err(|e| LunaError::Config(format!("解析配置失败: {}", e)))?;

        if !values.is_object() {
            return Err(LunaError::Config("配置根节点必须是对象".to_string()));
        }

        Ok(Some(values))
    }

    /// 内置默认配置
    pub fn default_values() -> Value {
        json!({
            "core": { "name": "AI Companion", "version": "1.0.0", "debug": true },
            "ollama": {
                "model": "llama2",
                "base_url": "http://localhost:11434",
                "temperature": 0.7,
                "max_tokens": 500
            },
            "memory": {
                "type": "basic",
                "max_memories": 1000,
                "semantic_search_enabled": false
            },
            "webui": { "enabled": false, "host": "127.0.0.1", "port": 5000, "debug": false },
            "plugins": {
                "enabled": true,
                "plugins_path": "./plugins/custom_plugins",
                "core_plugins": ["cli_interface"]
            },
            "integrations": {
                "discord": { "enabled": false, "token": "", "channel_id": "" },
                "vtube_studio": { "enabled": false, "websocket_url": "ws://localhost:8001" },
                "piper_tts": { "enabled": false, "model_path": "", "voice": "en_US-lessac-medium" }
            },
            "personality": {
                "learning_enabled": true,
                "adaptation_rate": 0.1,
                "emotional_context": true
            }
        })
    }

    /// 按点分路径查找原始值
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.values, |node, part| node.as_object()?.get(part))
    }

    /// 按点分路径读取并反序列化，缺失或类型不符时返回默认值
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.lookup(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(v) => v,
                Err(e) => {
                    debug!("Config key {} has unexpected type: {}", key, e);
                    default
                }
            },
            None => default,
        }
    }

    /// 按点分路径写入并立即保存；路径上的非对象节点会被替换为对象
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if key.is_empty() {
            return Err(LunaError::Config("配置键为空".to_string()));
        }

        if !self.values.is_object() {
            self.values = Value::Object(Map::new());
        }
        if let Value::Object(root) = &mut self.values {
            let parts: Vec<&str> = key.split('.').collect();
            insert_path(root, &parts, value.into());
        }

        self.save()
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| LunaError::Config(format!("创建目录失败: {}", e)))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| LunaError::Config(format!("序列化配置失败: {}", e)))?;

        fs::write(&self.path, content)
            .map_err(|e| LunaError::Config(format!("写入配置失败: {}", e)))?;

        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    /// 检查必需的配置段是否齐全
    pub fn validate(&self) -> bool {
        for section in REQUIRED_SECTIONS {
            if self.lookup(section).is_none() {
                error!("Missing required config section: {}", section);
                return false;
            }
        }
        true
    }

    pub fn memory(&self) -> MemoryConfig {
        MemoryConfig {
            max_memories: self.get("memory.max_memories", default_max_memories()),
            semantic_search_enabled: self.get("memory.semantic_search_enabled", false),
            vector_db_path: self.get("memory.vector_db_path", default_vector_db_path()),
        }
    }
}

fn insert_path(map: &mut Map<String, Value>, parts: &[&str], value: Value) {
    match parts {
        [] => {}
        [last] => {
            map.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let child = map
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::from_value(Self::default_path(), Self::default_values())
    }
}

/// 记忆子系统配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// 近期记忆最大条数
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,
    /// 是否启用向量检索
    #[serde(default)]
    pub semantic_search_enabled: bool,
    /// 向量索引存储目录
    #[serde(default = "default_vector_db_path")]
    pub vector_db_path: PathBuf,
}

fn default_max_memories() -> usize {
    1000
}

fn default_vector_db_path() -> PathBuf {
    PathBuf::from("./data/memories")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memories: default_max_memories(),
            semantic_search_enabled: false,
            vector_db_path: default_vector_db_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dotted_lookup_with_defaults() {
        let store = ConfigStore::default();
        assert_eq!(store.get("ollama.model", String::new()), "llama2");
        assert_eq!(store.get("memory.max_memories", 0usize), 1000);
        assert_eq!(store.get("memory.missing", 42u32), 42);
        assert_eq!(store.get("ollama.model.nested", 7u32), 7);
        assert!(!store.get("webui.enabled", true));
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let store = ConfigStore::default();
        assert_eq!(store.get("ollama.model", 5u32), 5);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(dir.path().join("nope.json"));
        assert!(store.validate());
        assert_eq!(store.memory(), MemoryConfig::default());
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::load(&path);
        assert_eq!(store.get("core.name", String::new()), "AI Companion");
    }

    #[test]
    fn test_set_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut store = ConfigStore::load(&path);
        store.set("memory.semantic_search_enabled", true).unwrap();
        store.set("memory.vector_db_path", "/tmp/luna-vec").unwrap();
        store.set("brand.new.key", 3).unwrap();

        let reloaded = ConfigStore::load(&path);
        let memory = reloaded.memory();
        assert!(memory.semantic_search_enabled);
        assert_eq!(memory.vector_db_path, PathBuf::from("/tmp/luna-vec"));
        assert_eq!(memory.max_memories, 1000);
        assert_eq!(reloaded.get("brand.new.key", 0), 3);
    }

    #[test]
    fn test_set_replaces_non_object_nodes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut store = ConfigStore::from_value(&path, json!("not an object"));
        store.set("core.name", "Luna").unwrap();
        assert_eq!(store.get("core.name", String::new()), "Luna");

        store.set("core.name.first", "Lu").unwrap();
        assert_eq!(store.get("core.name.first", String::new()), "Lu");
        assert!(store.set("", 1).is_err());

        let reloaded = ConfigStore::load(&path);
        assert_eq!(reloaded.get("core.name.first", String::new()), "Lu");
    }

    #[test]
    fn test_validate_reports_missing_section() {
        let store = ConfigStore::from_value("unused.json", json!({ "core": {}, "memory": {} }));
        assert!(!store.validate());
    }

    #[test]
    fn test_memory_config_serde_defaults() {
        let config: MemoryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MemoryConfig::default());
    }
}
