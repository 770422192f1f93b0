// src/sender.rs
use crate::error::SendError;
use async_trait::async_trait;

/// 向单个聊天用户发送文本。尽力而为，没有送达回执。
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), SendError>;
}
