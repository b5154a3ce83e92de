//! 统一错误处理

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LunaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("记忆存储错误: {0}")]
    Memory(String),

    #[error("监听器错误: {0}")]
    Listener(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("未知错误: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, LunaError>;
