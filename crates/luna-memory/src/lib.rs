//! Luna Memory - 陪伴记忆系统
//!
//! 两层记忆结构：
//! - 近期记忆 (Recency Store): 进程内有界列表，超出容量时按重要性淘汰
//! - 向量索引 (Embedding Index): 落盘的 JSON 索引，每条记忆附带特征向量，支持相似度检索
//!
//! [`MemoryManager`] 将两者统一为一个查询入口，按调用选择关键词检索或语义检索。
//!
//! 存储均为单写者设计：修改操作需要 `&mut self`，需要跨任务共享时由调用方自行加锁。

pub mod embedding;
pub mod index;
pub mod manager;
pub mod store;
pub mod types;

pub use embedding::*;
pub use index::*;
pub use manager::*;
pub use store::*;
pub use types::*;
