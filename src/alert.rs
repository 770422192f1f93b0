// src/alert.rs
use crate::types::{AlertLogEntry, ServiceMessage};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

pub const MAX_ALERT_HISTORY: usize = 50;

/// 运维告警通道。尽力而为，自身失败只记日志，不再向上传播。
#[async_trait]
pub trait OperatorAlert: Send + Sync {
    async fn notify(&self, text: &str);
}

/// 最近的告警记录 (最多保留 50 条，最新的在前)
#[derive(Clone, Default)]
pub struct AlertLog {
    entries: Arc<Mutex<VecDeque<AlertLogEntry>>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_ALERT_HISTORY))),
        }
    }

    pub async fn record(&self, message: &str) -> AlertLogEntry {
        let entry = AlertLogEntry {
            id: Uuid::new_v4().to_string(),
            message: message.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let mut history = self.entries.lock().await;
        history.push_front(entry.clone());
        if history.len() > MAX_ALERT_HISTORY {
            history.pop_back();
        }
        entry
    }

    pub async fn recent(&self) -> Vec<AlertLogEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }
}

/// 通过服务消息接口转发告警；未配置接口时只写日志和历史。
pub struct ServiceAlert {
    client: Client,
    endpoint: Option<Url>,
    secret: String,
    history: AlertLog,
}

impl ServiceAlert {
    pub fn new(client: Client, endpoint: Option<Url>, secret: String, history: AlertLog) -> Self {
        Self {
            client,
            endpoint,
            secret,
            history,
        }
    }
}

#[async_trait]
impl OperatorAlert for ServiceAlert {
    async fn notify(&self, text: &str) {
        self.history.record(text).await;
        info!("🚨 [Alert] {}", text);

        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let body = ServiceMessage {
            message_text: text,
            st: &self.secret,
        };
        match self.client.post(endpoint.clone()).json(&body).send().await {
            Ok(res) if res.status().is_success() => {}
            Ok(res) => warn!("⚠️ [Alert] Service message endpoint returned {}", res.status()),
            Err(e) => warn!("❌ [Alert] Sending service message failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn history_is_bounded_and_newest_first() {
        let log = AlertLog::new();
        for i in 0..(MAX_ALERT_HISTORY + 5) {
            log.record(&format!("alert {}", i)).await;
        }
        let recent = log.recent().await;
        assert_eq!(recent.len(), MAX_ALERT_HISTORY);
        assert_eq!(recent[0].message, format!("alert {}", MAX_ALERT_HISTORY + 4));
    }

    #[tokio::test]
    async fn posts_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendservicemessage"))
            .and(body_json(serde_json::json!({"messageText": "boom", "st": "s3cret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/sendservicemessage", server.uri())).unwrap();
        let log = AlertLog::new();
        let alert = ServiceAlert::new(Client::new(), Some(endpoint), "s3cret".into(), log.clone());
        alert.notify("boom").await;

        assert_eq!(log.recent().await.len(), 1);
    }

    #[tokio::test]
    async fn endpoint_failures_are_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/sendservicemessage", server.uri())).unwrap();
        let log = AlertLog::new();
        let alert = ServiceAlert::new(Client::new(), Some(endpoint), String::new(), log.clone());
        alert.notify("still recorded").await;

        assert_eq!(log.recent().await[0].message, "still recorded");
    }
}
