//! 交互式对话
//!
//! 不调用模型：每轮输入更新情绪状态、广播给监听器并写入对话记忆，
//! 回复为基于相关记忆与当前情绪的回显。

use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use luna_core::{CompanionListener, EmotionTracker, ListenerRegistry, Role};
use luna_memory::MemoryManager;

/// 把事件写入日志的监听器
struct LogListener;

#[async_trait]
impl CompanionListener for LogListener {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_message_received(&self, message: &str, kind: &str) -> luna_core::Result<()> {
        info!("[{}] received: {}", kind, message);
        Ok(())
    }

    async fn on_message_sent(&self, message: &str, kind: &str) -> luna_core::Result<()> {
        info!("[{}] sent: {}", kind, message);
        Ok(())
    }

    async fn on_memory_added(&self, content: &str, kind: &str) -> luna_core::Result<()> {
        info!("[{}] memory added ({} chars)", kind, content.chars().count());
        Ok(())
    }
}

pub async fn run(manager: &mut MemoryManager, history: usize) -> Result<()> {
    let registry = ListenerRegistry::new().with_listener(Arc::new(LogListener));
    let mut tracker = EmotionTracker::new();

    println!("💬 Luna chat. Type 'exit' to quit.");
    for turn in manager.conversation_history(history) {
        let speaker = match turn.role {
            Role::User => "You",
            _ => "Luna",
        };
        println!("{}: {}", speaker, turn.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        tracker.update(input);
        registry.broadcast_message_received(input, "user").await;

        let reply = compose_reply(manager, &tracker, input);
        println!("Luna: {}", reply);
        registry.broadcast_message_sent(&reply, "assistant").await;

        let label = tracker.memory_label();
        manager.add_conversation_memory(input, &reply, &label);
        registry
            .broadcast_memory_added(&format!("User: {}\nAI: {}", input, reply), "conversation")
            .await;
    }

    manager.save()?;
    println!("👋 Bye");
    Ok(())
}

fn compose_reply(manager: &MemoryManager, tracker: &EmotionTracker, input: &str) -> String {
    let related = manager.search(input, 1, manager.semantic_enabled());
    match related.first() {
        Some(memory) => format!(
            "{}. This reminds me of: {}",
            tracker.prompt_context(),
            memory.content.replace('\n', " | ")
        ),
        None => tracker.prompt_context(),
    }
}
