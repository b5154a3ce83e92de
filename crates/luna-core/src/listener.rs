//! 事件监听
//!
//! 集成（命令行、Web 界面、聊天机器人、虚拟形象、语音合成）通过实现
//! [`CompanionListener`] 接收消息与记忆事件，并显式注册到 [`ListenerRegistry`]。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;

#[async_trait]
pub trait CompanionListener: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// 收到一条消息（通常来自用户）
    async fn on_message_received(&self, _message: &str, _kind: &str) -> Result<()> {
        Ok(())
    }

    /// 发出一条消息（通常是模型回复）
    async fn on_message_sent(&self, _message: &str, _kind: &str) -> Result<()> {
        Ok(())
    }

    /// 新增了一条记忆
    async fn on_memory_added(&self, _content: &str, _kind: &str) -> Result<()> {
        Ok(())
    }
}

/// 监听器注册表，按注册顺序广播事件
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn CompanionListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn CompanionListener>) {
        info!("Registered listener: {}", listener.name());
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn CompanionListener>) -> Self {
        self.register(listener);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.listeners.iter().map(|l| l.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn enabled(&self) -> impl Iterator<Item = &Arc<dyn CompanionListener>> {
        self.listeners.iter().filter(|l| l.is_enabled())
    }

    pub async fn broadcast_message_received(&self, message: &str, kind: &str) {
        for listener in self.enabled() {
            if let Err(e) = listener.on_message_received(message, kind).await {
                warn!("Listener {} failed on message received: {}", listener.name(), e);
            }
        }
        debug!("Broadcast message received to {} listeners", self.len());
    }

    pub async fn broadcast_message_sent(&self, message: &str, kind: &str) {
        for listener in self.enabled() {
            if let Err(e) = listener.on_message_sent(message, kind).await {
                warn!("Listener {} failed on message sent: {}", listener.name(), e);
            }
        }
        debug!("Broadcast message sent to {} listeners", self.len());
    }

    pub async fn broadcast_memory_added(&self, content: &str, kind: &str) {
        for listener in self.enabled() {
            if let Err(e) = listener.on_memory_added(content, kind).await {
                warn!("Listener {} failed on memory added: {}", listener.name(), e);
            }
        }
    }
}
