// src/types.rs

use crate::error::SendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==============================================================================
// 1. 订阅记录
// ==============================================================================

/// 一个城市 (direction) 及其订阅者。
/// `subscribers` 无重复，按加入顺序保存，广播时按此顺序发送。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionRecord {
    pub direction: String,
    pub subscribers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DirectionRecord {
    pub fn new(direction: &str, first_subscriber: &str, now: DateTime<Utc>) -> Self {
        Self {
            direction: direction.to_string(),
            subscribers: vec![first_subscriber.to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers.iter().any(|s| s == subscriber_id)
    }
}

// ==============================================================================
// 2. HTTP 请求 / 响应
// ==============================================================================

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InventoryPayload {
    pub direction: String,
    #[serde(rename = "inventoryStr")]
    pub inventory_str: String,
}

/// 单个收件人的发送结果
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub result: Result<(), SendError>,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub total: usize,
    /// 顺序与订阅者列表一致
    pub outcomes: Vec<DeliveryOutcome>,
}

impl BroadcastReport {
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            delivered: outcomes.iter().filter(|o| o.is_delivered()).count(),
            total: outcomes.len(),
            outcomes,
        }
    }

    pub fn failed_recipients(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_delivered())
            .map(|o| o.recipient.as_str())
    }

    pub fn summary(&self) -> BroadcastSummary {
        BroadcastSummary {
            delivered: self.delivered,
            total: self.total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub delivered: usize,
    pub total: usize,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AlertLogEntry {
    pub id: String,
    pub message: String,
    pub timestamp: i64,
}

/// 服务消息接口的请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMessage<'a> {
    pub message_text: &'a str,
    pub st: &'a str,
}

// ==============================================================================
// 3. Viber 回调与 API 结构
// ==============================================================================

// ✨ 利用 serde(tag = "event") 分流，只关心 message 事件
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViberEvent {
    Message {
        sender: ViberUser,
        message: ViberMessage,
    },

    // webhook / subscribed / conversation_started / delivered / seen ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViberUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViberMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

impl ViberMessage {
    pub fn text(&self) -> Option<&str> {
        if self.kind == "text" {
            self.text.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViberSenderInfo {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct ViberSendMessage<'a> {
    pub receiver: &'a str,
    pub min_api_version: u32,
    pub sender: &'a ViberSenderInfo,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ViberSetWebhook<'a> {
    pub url: &'a str,
    pub event_types: &'a [&'static str],
    pub send_name: bool,
}

#[derive(Debug, Deserialize)]
pub struct ViberApiResponse {
    pub status: i64,
    #[serde(default)]
    pub status_message: String,
}
