//! Luna Core - 核心类型和抽象
//!
//! 提供项目的基础类型、错误处理、配置、情绪状态和事件监听等核心功能。

pub mod config;
pub mod emotion;
pub mod error;
pub mod listener;
pub mod message;

pub use config::*;
pub use emotion::*;
pub use error::*;
pub use listener::*;
pub use message::*;
