// src/store/mod.rs
//! 订阅记录的持久化抽象。
//!
//! Registry 只通过 [`SubscriptionStore`] 访问数据，具体后端在启动时注入。

use crate::{error::StoreError, types::DirectionRecord};
use async_trait::async_trait;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// 按 direction 精确查找，不存在时返回 `Ok(None)`。
    async fn get(&self, direction: &str) -> Result<Option<DirectionRecord>, StoreError>;

    /// 所有包含该订阅者的记录，按 direction 升序。
    async fn find_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<DirectionRecord>, StoreError>;

    /// 创建或整体替换记录，返回持久化后的版本。
    /// 已有记录的 `created_at` 保持不变；失败时原记录不受影响。
    async fn put(&self, record: DirectionRecord) -> Result<DirectionRecord, StoreError>;
}
