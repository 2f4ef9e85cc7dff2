//! `foliant serve` — start the HTTP gateway.

use anyhow::Result;
use foliant_config::AppConfig;

pub async fn run(mut config: AppConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.gateway.port = port;
    }

    foliant_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))
}
