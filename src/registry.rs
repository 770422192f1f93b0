// src/registry.rs
//! 订阅关系的查询与切换。所有状态都在 [`SubscriptionStore`] 里，Registry 本身无状态。

use crate::{error::StoreError, store::SubscriptionStore, types::DirectionRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn SubscriptionStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// 某个城市的订阅者，按加入顺序。没有记录时返回空列表。
    pub async fn subscribers_of(&self, direction: &str) -> Result<Vec<String>, StoreError> {
        let record = self.store.get(direction).await.map_err(|e| {
            error!("❌ [REGISTRY] Getting subscribers of '{}' failed: {}", direction, e);
            e
        })?;
        Ok(record.map(|r| r.subscribers).unwrap_or_default())
    }

    /// 某个用户订阅的所有城市，按城市名升序。
    pub async fn directions_of(&self, subscriber_id: &str) -> Result<Vec<String>, StoreError> {
        let records = self
            .store
            .find_by_subscriber(subscriber_id)
            .await
            .map_err(|e| {
                error!(
                    "❌ [REGISTRY] Getting directions of {} failed: {}",
                    subscriber_id, e
                );
                e
            })?;
        Ok(records.into_iter().map(|r| r.direction).collect())
    }

    /// 已订阅则取消，未订阅则加入；城市不存在时新建记录。
    /// 每次调用都会翻转状态，连续调用两次等于没调用。
    pub async fn toggle(
        &self,
        subscriber_id: &str,
        direction: &str,
    ) -> Result<DirectionRecord, StoreError> {
        let now = Utc::now();

        let record = match self.store.get(direction).await? {
            None => {
                info!(
                    "➕ [REGISTRY] New direction '{}' with first subscriber {}",
                    direction, subscriber_id
                );
                DirectionRecord::new(direction, subscriber_id, now)
            }
            Some(mut record) => {
                match record.subscribers.iter().position(|s| s == subscriber_id) {
                    Some(idx) => {
                        record.subscribers.remove(idx);
                        info!("➖ [REGISTRY] {} unsubscribed from '{}'", subscriber_id, direction);
                    }
                    None => {
                        record.subscribers.push(subscriber_id.to_string());
                        info!("➕ [REGISTRY] {} subscribed to '{}'", subscriber_id, direction);
                    }
                }
                record.updated_at = now;
                record
            }
        };

        self.store.put(record).await.map_err(|e| {
            error!(
                "❌ [REGISTRY] Saving '{}' for {} failed: {}",
                direction, subscriber_id, e
            );
            e
        })
    }
}
