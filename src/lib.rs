// src/lib.rs
pub mod alert;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http_handlers;
pub mod interpreter;
pub mod registry;
pub mod sender;
pub mod store;
pub mod types;
pub mod viber;
pub mod webhook;

use alert::{AlertLog, OperatorAlert, ServiceAlert};
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use config::{Config, MEMORY_DATABASE};
use dispatcher::{Dispatcher, FanoutStrategy};
use interpreter::CommandInterpreter;
use registry::Registry;
use sender::MessageSender;
use std::sync::Arc;
use store::{MemoryStore, SqliteStore, SubscriptionStore};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viber::ViberClient;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub interpreter: CommandInterpreter,
    pub dispatcher: Dispatcher,
    /// 回复用户、转发给管理员都走这里
    pub sender: Arc<dyn MessageSender>,
    pub alerts: Arc<dyn OperatorAlert>,
    pub alert_log: AlertLog,
}

impl ServerState {
    /// 用已构建好的组件组装状态，Registry / Dispatcher / Interpreter 共享同一个存储。
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn SubscriptionStore>,
        sender: Arc<dyn MessageSender>,
        alerts: Arc<dyn OperatorAlert>,
        alert_log: AlertLog,
    ) -> Self {
        let registry = Registry::new(store);
        let dispatcher = Dispatcher::new(
            registry.clone(),
            sender.clone(),
            FanoutStrategy::from_limit(config.fanout_concurrency),
        );
        Self {
            interpreter: CommandInterpreter::new(registry.clone()),
            config,
            registry,
            dispatcher,
            sender,
            alerts,
            alert_log,
        }
    }
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventories_notifier=info,tower_http=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn setup_shared_state(config: Arc<Config>) -> anyhow::Result<ServerState> {
    // Store
    let store: Arc<dyn SubscriptionStore> = if config.database_url == MEMORY_DATABASE {
        warn!("⚠️ [STORE] Using in-memory store, subscriptions are lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?;
        info!("🗃️ [STORE] SQLite store ready at {}", config.database_url);
        Arc::new(store)
    };

    // Viber client & alerts
    let viber = ViberClient::new(&config).context("Failed to build Viber client")?;
    let alert_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build alert client")?;
    let alert_log = AlertLog::new();
    let alerts = Arc::new(ServiceAlert::new(
        alert_client,
        config.service_endpoint.clone(),
        config.service_secret.clone(),
        alert_log.clone(),
    ));
    if config.service_endpoint.is_none() {
        warn!("⚠️ [Alert] SERVER_ADDR not set, operator alerts are only logged");
    }

    Ok(ServerState::new(
        config,
        store,
        Arc::new(viber),
        alerts,
        alert_log,
    ))
}

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/viber/webhook", post(webhook::viber_webhook_handler))
        .route("/inventory", post(http_handlers::inventory_handler))
        .route(
            "/directions/{direction}/subscribers",
            get(http_handlers::subscribers_handler),
        )
        .route("/alerts", get(http_handlers::alerts_handler))
        .route("/health", get(http_handlers::health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
