// src/http_handlers.rs
use super::{
    error::{AppError, BroadcastError},
    types::{AlertLogEntry, BroadcastSummary, InventoryPayload},
    ServerState,
};
use axum::{
    extract::{Path, State},
    response::Json as AxumJson,
};
use tracing::{info, warn};

/// 新的描述报告就绪：群发给该城市的所有订阅者。
///
/// 200 表示已逐个尝试发送 (可能部分失败)，410 表示没有订阅者，500 表示查询订阅者失败。
/// 后两种情况都会通知运维。
pub async fn inventory_handler(
    State(state): State<ServerState>,
    AxumJson(payload): AxumJson<InventoryPayload>,
) -> Result<AxumJson<BroadcastSummary>, AppError> {
    info!("📦 [INVENTORY] Post package inventory: {}", payload.direction);

    match state
        .dispatcher
        .broadcast(&payload.direction, &payload.inventory_str)
        .await
    {
        Ok(report) => {
            let failed: Vec<&str> = report.failed_recipients().collect();
            if !failed.is_empty() {
                warn!(
                    "⚠️ [INVENTORY] '{}' not delivered to {:?}",
                    payload.direction, failed
                );
            }
            Ok(AxumJson(report.summary()))
        }
        Err(e) => {
            let alert = match &e {
                BroadcastError::Lookup(_) => format!(
                    "viber: Ошибка получения пользователей по городу {}",
                    payload.direction
                ),
                BroadcastError::NoSubscribers(_) => {
                    format!("viber: Нет подписчиков для описи {}", payload.direction)
                }
            };
            state.alerts.notify(&alert).await;
            Err(e.into())
        }
    }
}

pub async fn subscribers_handler(
    State(state): State<ServerState>,
    Path(direction): Path<String>,
) -> Result<AxumJson<Vec<String>>, AppError> {
    Ok(AxumJson(state.registry.subscribers_of(&direction).await?))
}

pub async fn alerts_handler(State(state): State<ServerState>) -> AxumJson<Vec<AlertLogEntry>> {
    AxumJson(state.alert_log.recent().await)
}

pub async fn health_handler() -> &'static str {
    "ok"
}
