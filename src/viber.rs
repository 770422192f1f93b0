// src/viber.rs

use crate::{
    config::Config,
    error::SendError,
    sender::MessageSender,
    types::{ViberApiResponse, ViberSendMessage, ViberSenderInfo, ViberSetWebhook},
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

const AUTH_HEADER: &str = "X-Viber-Auth-Token";
pub const SIGNATURE_HEADER: &str = "X-Viber-Content-Signature";

const WEBHOOK_EVENTS: &[&str] = &[
    "delivered",
    "seen",
    "failed",
    "subscribed",
    "unsubscribed",
    "conversation_started",
];

/// Viber Bot API 客户端
#[derive(Clone)]
pub struct ViberClient {
    http: Client,
    api_url: String,
    token: String,
    sender: std::sync::Arc<ViberSenderInfo>,
}

impl ViberClient {
    pub fn new(config: &Config) -> Result<Self, SendError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            api_url: config.viber_api_url.clone(),
            token: config.viber_token.clone(),
            sender: std::sync::Arc::new(ViberSenderInfo {
                name: config.bot_name.clone(),
                avatar: config.bot_avatar.clone(),
            }),
        })
    }

    /// 注册回调地址，Viber 会先向该地址发一个 `webhook` 事件做校验。
    pub async fn set_webhook(&self, url: &str) -> Result<(), SendError> {
        let body = ViberSetWebhook {
            url,
            event_types: WEBHOOK_EVENTS,
            send_name: true,
        };
        self.call("set_webhook", &body).await?;
        info!("🔗 [VIBER] Webhook registered at {}", url);
        Ok(())
    }

    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<(), SendError> {
        let url = format!("{}/{}", self.api_url, method);
        let res = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let reply: ViberApiResponse = res.json().await?;
        if reply.status != 0 {
            warn!(
                "⚠️ [VIBER] {} rejected: status {} ({})",
                method, reply.status, reply.status_message
            );
            return Err(SendError::Rejected {
                status: reply.status,
                message: reply.status_message,
            });
        }
        Ok(())
    }
}

/// 校验回调签名：HMAC-SHA256(body, token) 的十六进制串。
pub fn verify_signature(token: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(token.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[async_trait]
impl MessageSender for ViberClient {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), SendError> {
        let body = ViberSendMessage {
            receiver: recipient_id,
            min_api_version: 1,
            sender: &self.sender,
            kind: "text",
            text,
        };
        self.call("send_message", &body).await
    }
}

#[cfg(test)]
pub(crate) fn sign(token: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(token.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(api_url: &str) -> ViberClient {
        let config = Config {
            viber_api_url: api_url.to_string(),
            viber_token: "secret-token".to_string(),
            ..Config::default()
        };
        ViberClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn send_posts_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_message"))
            .and(header(AUTH_HEADER, "secret-token"))
            .and(body_partial_json(serde_json::json!({
                "receiver": "u1",
                "type": "text",
                "text": "ready",
                "sender": {"name": "Описи"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": 0, "status_message": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri()).send("u1", "ready").await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_status_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_message"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"status": 6, "status_message": "notSubscribed"}),
            ))
            .mount(&server)
            .await;

        let err = client(&server.uri()).send("u1", "x").await.unwrap_err();
        assert!(matches!(err, SendError::Rejected { status: 6, .. }));
    }

    #[tokio::test]
    async fn http_errors_are_transport_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server.uri()).send("u1", "x").await.unwrap_err();
        assert!(matches!(err, SendError::Transport(_)));
    }

    #[tokio::test]
    async fn set_webhook_sends_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/set_webhook"))
            .and(body_partial_json(serde_json::json!({"url": "https://bot.example/viber/webhook"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": 0})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri())
            .set_webhook("https://bot.example/viber/webhook")
            .await
            .unwrap();
    }

    #[test]
    fn signature_checks_body_and_token() {
        let body = br#"{"event":"webhook"}"#;
        let sig = sign("secret-token", body);
        assert!(verify_signature("secret-token", body, &sig));
        assert!(!verify_signature("secret-token", b"tampered", &sig));
        assert!(!verify_signature("other-token", body, &sig));
        assert!(!verify_signature("secret-token", body, "not-hex"));
    }
}
