//! End-to-end scenarios through the public memory API.

use luna_core::{ConfigStore, MemoryConfig};
use luna_memory::{
    BagOfWordsEmbedding, EmbeddingIndex, EmbeddingProvider, KIND_CONVERSATION, KIND_FACT,
    MemoryManager, MemoryRecord, cosine_similarity,
};
use serde_json::json;
use tempfile::TempDir;

fn love_records() -> Vec<MemoryRecord> {
    vec![
        MemoryRecord::new("I love pizza", KIND_FACT, "happy", 0.8),
        MemoryRecord::new("The weather is nice", KIND_CONVERSATION, "neutral", 0.5),
        MemoryRecord::new("I love coding", KIND_FACT, "excited", 0.9),
    ]
}

#[test]
fn basic_search_returns_only_love_records() {
    let mut manager = MemoryManager::new(MemoryConfig::default());
    for record in love_records() {
        manager.add_memory(record);
    }

    let results = manager.search("love", 10, false);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.content.contains("love")));
}

#[test]
fn eviction_keeps_most_important() {
    let mut manager = MemoryManager::new(MemoryConfig {
        max_memories: 2,
        ..Default::default()
    });
    for importance in [0.9, 0.1, 0.5] {
        manager.add_memory(MemoryRecord::new(
            format!("importance {}", importance),
            KIND_FACT,
            "",
            importance,
        ));
    }

    let mut kept: Vec<f64> = manager.store().iter().map(|r| r.importance).collect();
    kept.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(kept, vec![0.5, 0.9]);
}

#[test]
fn adding_past_capacity_leaves_exactly_capacity() {
    let mut manager = MemoryManager::new(MemoryConfig {
        max_memories: 10,
        ..Default::default()
    });
    for i in 0..25 {
        manager.add_memory(MemoryRecord::new(
            format!("memory {}", i),
            KIND_CONVERSATION,
            "",
            (i % 7) as f64 / 7.0,
        ));
    }
    assert_eq!(manager.store().len(), 10);
    assert_eq!(manager.recent(100).len(), 10);
}

#[test]
fn semantic_search_ranks_pizza_first() {
    let dir = TempDir::new().unwrap();
    let mut manager = MemoryManager::new(MemoryConfig {
        semantic_search_enabled: true,
        vector_db_path: dir.path().join("memories"),
        ..Default::default()
    });
    manager.add_memory(MemoryRecord::new("I love pizza", KIND_FACT, "happy", 0.8));
    manager.add_memory(MemoryRecord::new("The weather is nice", KIND_CONVERSATION, "", 0.5));

    let results = manager.semantic_search("pizza", 5);
    assert_eq!(results[0].content, "I love pizza");
}

#[test]
fn config_store_drives_semantic_setup() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    let index_dir = dir.path().join("vectors");
    std::fs::write(
        &config_path,
        serde_json::to_string(&json!({
            "core": {},
            "ollama": {},
            "plugins": {},
            "memory": {
                "max_memories": 3,
                "semantic_search_enabled": true,
                "vector_db_path": index_dir,
            }
        }))
        .unwrap(),
    )
    .unwrap();

    let config = ConfigStore::load(&config_path);
    assert!(config.validate());

    let mut manager = MemoryManager::new(config.memory());
    assert!(manager.semantic_enabled());
    assert_eq!(manager.store().capacity(), 3);

    manager.add_conversation_memory("hello", "hi!", "slightly_joy");
    assert!(index_dir.join("memories.json").exists());
}

#[test]
fn custom_provider_index_round_trip() {
    let dir = TempDir::new().unwrap();
    let provider = std::sync::Arc::new(BagOfWordsEmbedding::with_dimensions(16));
    let mut index = EmbeddingIndex::with_provider(dir.path(), provider.clone());
    index.add("short vectors work too", KIND_FACT, "", 0.4, Default::default());

    let reloaded = EmbeddingIndex::with_provider(dir.path(), provider.clone());
    let stored = &reloaded.records()[0].embedding;
    assert_eq!(stored.len(), 16);
    let fresh = provider.embed("short vectors work too");
    assert!((cosine_similarity(stored, &fresh) - 1.0).abs() < 1e-9);
}
