// src/main.rs
use inventories_notifier::{
    build_router, config::Config, init_tracing, setup_shared_state, viber::ViberClient,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("🔥 Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let server_state = setup_shared_state(config.clone()).await?;
    let app = build_router(server_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 Inventories notifier is running at http://{}", config.listen_addr);

    // Viber 注册 webhook 时会立即回调，所以要在开始监听之后再注册
    if let Some(webhook_url) = config.webhook_url.clone() {
        let viber = ViberClient::new(&config)?;
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            if let Err(e) = viber.set_webhook(&webhook_url).await {
                warn!("⚠️ [VIBER] Webhook registration failed: {}", e);
            }
        });
    }

    axum::serve(listener, app).await?;
    Ok(())
}
