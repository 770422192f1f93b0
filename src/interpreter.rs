// src/interpreter.rs

use crate::{error::InterpretError, registry::Registry};

pub const SUBSCRIBED_PREFIX: &str = "Вы подписаны на города: ";
pub const TOGGLE_FAILED_REPLY: &str = "Ошибка добавления города";
pub const LISTING_FAILED_REPLY: &str = "Ошибка получения вашего списка городов";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub ack_text: String,
    pub subscribed_directions: Vec<String>,
}

/// 把用户发来的文本当作城市名，切换订阅并生成回复。
#[derive(Clone)]
pub struct CommandInterpreter {
    registry: Registry,
}

impl CommandInterpreter {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// 整条消息原样作为城市名，不做 trim 和大小写归一。
    pub async fn interpret(
        &self,
        sender_id: &str,
        raw_text: &str,
    ) -> Result<Acknowledgement, InterpretError> {
        self.registry
            .toggle(sender_id, raw_text)
            .await
            .map_err(InterpretError::Toggle)?;

        let directions = self
            .registry
            .directions_of(sender_id)
            .await
            .map_err(InterpretError::Listing)?;

        Ok(Acknowledgement {
            ack_text: format!("{}{}", SUBSCRIBED_PREFIX, directions.join(", ")),
            subscribed_directions: directions,
        })
    }
}

impl InterpretError {
    /// 回复给用户的文案
    pub fn reply_text(&self) -> &'static str {
        match self {
            InterpretError::Toggle(_) => TOGGLE_FAILED_REPLY,
            InterpretError::Listing(_) => LISTING_FAILED_REPLY,
        }
    }

    /// 发给运维的告警文案
    pub fn operator_text(&self, sender_name: &str, sender_id: &str) -> String {
        match self {
            InterpretError::Toggle(_) => format!(
                "viber-inventories: Ошибка получения/добавления города у {} - {}",
                sender_name, sender_id
            ),
            InterpretError::Listing(_) => format!(
                "viber: Ошибка получения списка городов у {} - {}",
                sender_name, sender_id
            ),
        }
    }
}
