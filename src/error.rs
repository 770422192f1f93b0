// src/error.rs
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// 持久层错误：连接失败、约束冲突或记录损坏。
/// "记录不存在" 不属于错误，由 `Ok(None)` 表示。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt subscriber list for direction '{direction}': {source}")]
    Corrupt {
        direction: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 单个收件人的发送失败。只记录在广播结果里，不会让整次广播失败。
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Viber rejected the request (status {status}): {message}")]
    Rejected { status: i64, message: String },
}

/// 指令解释器的失败，区分是哪一步出错，调用方据此选择回复文案。
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("Toggle failed: {0}")]
    Toggle(#[source] StoreError),

    #[error("Listing subscribed directions failed: {0}")]
    Listing(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("No subscribers for direction '{0}'")]
    NoSubscribers(String),

    #[error("Subscriber lookup failed: {0}")]
    Lookup(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
}

// HTTP 层的错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid webhook signature")]
    BadSignature,

    #[error("Malformed payload: {0}")]
    BadPayload(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Broadcast(BroadcastError::NoSubscribers(_)) => StatusCode::GONE,
            AppError::Broadcast(BroadcastError::Lookup(_)) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadSignature => StatusCode::FORBIDDEN,
            AppError::BadPayload(_) => StatusCode::BAD_REQUEST,
        };

        if status.is_server_error() {
            tracing::error!("HTTP Handler Error: {}", self);
        } else {
            tracing::warn!("HTTP Handler Error: {}", self);
        }

        // 不向调用方暴露内部细节，只返回状态码
        status.into_response()
    }
}
