//! 记忆管理 CLI 工具

use anyhow::Result;
use clap::Subcommand;

use luna_memory::{KIND_CONVERSATION, MemoryManager, MemoryRecord};

#[derive(Debug, Subcommand)]
pub enum MemoryCommand {
    /// Store a memory
    Add {
        /// Memory content
        content: String,
        /// Memory type (conversation, fact, ...)
        #[arg(short, long, default_value = KIND_CONVERSATION)]
        kind: String,
        /// Emotional label, e.g. moderately_joy
        #[arg(short, long, default_value = "")]
        emotion: String,
        /// Importance between 0.0 and 1.0
        #[arg(short, long, default_value = "0.5")]
        importance: f64,
    },
    /// Store a fact about the user
    Fact {
        fact: String,
        #[arg(short, long, default_value = "")]
        emotion: String,
        #[arg(short, long, default_value = "0.8")]
        importance: f64,
    },
    /// Search memories
    Search {
        query: String,
        #[arg(short, long, default_value = "5")]
        limit: usize,
        /// Use keyword search even when the vector index is enabled
        #[arg(long)]
        basic: bool,
    },
    /// Show the most recent memories
    Recent {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Find memories by emotional label
    Emotion {
        emotion: String,
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
    /// Print memory statistics as JSON
    Stats,
}

impl MemoryCommand {
    pub fn execute(&self, manager: &mut MemoryManager) -> Result<()> {
        match self {
            MemoryCommand::Add {
                content,
                kind,
                emotion,
                importance,
            } => {
                let id = manager.add_memory(MemoryRecord::new(
                    content.as_str(),
                    kind.as_str(),
                    emotion.as_str(),
                    *importance,
                ));
                manager.save()?;
                println!("✅ Stored {}", id);
            }
            MemoryCommand::Fact {
                fact,
                emotion,
                importance,
            } => {
                let id = manager.add_user_fact(fact, emotion, *importance);
                manager.save()?;
                println!("✅ Stored {}", id);
            }
            MemoryCommand::Search {
                query,
                limit,
                basic,
            } => {
                let use_semantic = manager.semantic_enabled() && !basic;
                print_records(&manager.search(query, *limit, use_semantic));
            }
            MemoryCommand::Recent { limit } => {
                print_records(&manager.recent(*limit));
            }
            MemoryCommand::Emotion { emotion, limit } => {
                print_records(&manager.search_by_emotion(emotion, *limit));
            }
            MemoryCommand::Stats => {
                println!("{}", serde_json::to_string_pretty(&manager.stats())?);
            }
        }
        Ok(())
    }
}

fn print_records(records: &[MemoryRecord]) {
    if records.is_empty() {
        println!("No memories found");
        return;
    }

    for (i, record) in records.iter().enumerate() {
        let emotion = if record.emotional_context.is_empty() {
            String::new()
        } else {
            format!(" <{}>", record.emotional_context)
        };
        println!(
            "{}. [{}]{} {:.2} {}",
            i + 1,
            record.kind,
            emotion,
            record.importance,
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        for line in record.content.lines() {
            println!("   {}", line);
        }
    }
}
