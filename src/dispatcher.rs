// src/dispatcher.rs

use crate::{
    error::BroadcastError,
    registry::Registry,
    sender::MessageSender,
    types::{BroadcastReport, DeliveryOutcome},
};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// 群发策略。两种策略结果一致，outcomes 都按订阅者顺序排列。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutStrategy {
    Sequential,
    Concurrent { limit: usize },
}

impl FanoutStrategy {
    pub fn from_limit(limit: usize) -> Self {
        if limit <= 1 {
            FanoutStrategy::Sequential
        } else {
            FanoutStrategy::Concurrent { limit }
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    sender: Arc<dyn MessageSender>,
    strategy: FanoutStrategy,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        sender: Arc<dyn MessageSender>,
        strategy: FanoutStrategy,
    ) -> Self {
        Self {
            registry,
            sender,
            strategy,
        }
    }

    /// 把 payload 原样发给城市的每个订阅者。
    /// 单个收件人失败不影响其他人，也不重试；结果里带每个收件人的成败。
    pub async fn broadcast(
        &self,
        direction: &str,
        payload: &str,
    ) -> Result<BroadcastReport, BroadcastError> {
        let recipients = self
            .registry
            .subscribers_of(direction)
            .await
            .map_err(BroadcastError::Lookup)?;

        if recipients.is_empty() {
            info!("📭 [FANOUT] No users to send '{}' inventory", direction);
            return Err(BroadcastError::NoSubscribers(direction.to_string()));
        }

        info!(
            "📨 [FANOUT] Sending '{}' inventory to {} subscribers ({:?})",
            direction,
            recipients.len(),
            self.strategy
        );

        let outcomes = match self.strategy {
            FanoutStrategy::Sequential => {
                let mut outcomes = Vec::with_capacity(recipients.len());
                for recipient in &recipients {
                    outcomes.push(self.deliver(recipient, payload).await);
                }
                outcomes
            }
            FanoutStrategy::Concurrent { limit } => {
                // buffered 保持输入顺序；收件人按值移入 future，满足 Send
                stream::iter(recipients.iter().cloned())
                    .map(|recipient| async move { self.deliver(&recipient, payload).await })
                    .buffered(limit.max(1))
                    .collect::<Vec<_>>()
                    .await
            }
        };

        let report = BroadcastReport::from_outcomes(outcomes);
        info!(
            "✅ [FANOUT] '{}' delivered {}/{}",
            direction, report.delivered, report.total
        );
        Ok(report)
    }

    async fn deliver(&self, recipient: &str, payload: &str) -> DeliveryOutcome {
        let result = self.sender.send(recipient, payload).await;
        if let Err(e) = &result {
            warn!("⚠️ [FANOUT] Sending to {} failed: {}", recipient, e);
        }
        DeliveryOutcome {
            recipient: recipient.to_string(),
            result,
        }
    }
}
