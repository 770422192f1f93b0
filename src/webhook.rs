// src/webhook.rs
//! Viber 回调入口：每条文本消息都当作一次订阅切换。

use crate::{
    error::AppError,
    types::{ViberEvent, ViberUser},
    viber::{verify_signature, SIGNATURE_HEADER},
    ServerState,
};
use axum::extract::State;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tracing::{error, info, warn};

pub async fn viber_webhook_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    if state.config.verify_signatures {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::BadSignature)?;
        if !verify_signature(&state.config.viber_token, &body, signature) {
            return Err(AppError::BadSignature);
        }
    }

    match serde_json::from_slice::<ViberEvent>(&body)? {
        ViberEvent::Message { sender, message } => match message.text() {
            Some(text) => handle_text_message(&state, &sender, text).await,
            None => info!(
                "📎 [WEBHOOK] Ignoring non-text message ({}) from {}",
                message.kind, sender.id
            ),
        },
        ViberEvent::Other => {}
    }

    // Viber 只需要知道回调已收到，业务失败已经单独回复给用户
    Ok(StatusCode::OK)
}

async fn handle_text_message(state: &ServerState, sender: &ViberUser, text: &str) {
    info!(
        "💬 [WEBHOOK] New message from {} ({}): {}",
        sender.id, sender.name, text
    );

    if let Some(admin_id) = &state.config.admin_id {
        let copy = format!(
            "New message from user: {} {}: {}",
            sender.id, sender.name, text
        );
        if let Err(e) = state.sender.send(admin_id, &copy).await {
            warn!("⚠️ [WEBHOOK] Forwarding to admin failed: {}", e);
        }
    }

    let reply = match state.interpreter.interpret(&sender.id, text).await {
        Ok(ack) => ack.ack_text,
        Err(e) => {
            error!("❌ [WEBHOOK] Command from {} failed: {}", sender.id, e);
            state
                .alerts
                .notify(&e.operator_text(&sender.name, &sender.id))
                .await;
            e.reply_text().to_string()
        }
    };

    if let Err(e) = state.sender.send(&sender.id, &reply).await {
        warn!("⚠️ [WEBHOOK] Replying to {} failed: {}", sender.id, e);
    }
}
