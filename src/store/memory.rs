// src/store/memory.rs

use super::SubscriptionStore;
use crate::{error::StoreError, types::DirectionRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// 进程内存储，重启即丢失。BTreeMap 保证扫描顺序与 SQLite 的 `ORDER BY direction` 一致。
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, DirectionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get(&self, direction: &str) -> Result<Option<DirectionRecord>, StoreError> {
        Ok(self.records.read().await.get(direction).cloned())
    }

    async fn find_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<DirectionRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.has_subscriber(subscriber_id))
            .cloned()
            .collect())
    }

    async fn put(&self, mut record: DirectionRecord) -> Result<DirectionRecord, StoreError> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&record.direction) {
            record.created_at = existing.created_at;
        }
        records.insert(record.direction.clone(), record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn put_keeps_first_created_at() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = store
            .put(DirectionRecord::new("Oslo", "u1", now))
            .await
            .unwrap();

        let later = DirectionRecord::new("Oslo", "u2", now + Duration::hours(1));
        let stored = store.put(later).await.unwrap();
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.subscribers, vec!["u2"]);
    }

    #[tokio::test]
    async fn scan_is_sorted_by_direction() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for d in ["Tokyo", "Berlin", "Oslo"] {
            store.put(DirectionRecord::new(d, "u1", now)).await.unwrap();
        }
        store.put(DirectionRecord::new("Paris", "u2", now)).await.unwrap();

        let found: Vec<String> = store
            .find_by_subscriber("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.direction)
            .collect();
        assert_eq!(found, vec!["Berlin", "Oslo", "Tokyo"]);
    }
}
