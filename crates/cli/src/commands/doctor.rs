//! `foliant doctor` — diagnose configuration and connectivity.

use anyhow::Result;
use foliant_client::RemoteApi;
use foliant_config::AppConfig;

pub async fn run(config: AppConfig) -> Result<()> {
    println!("Foliant doctor\n");

    println!("Configuration");
    println!("  remote url      : {}", config.remote.base_url);
    println!(
        "  security token  : {}",
        if config.remote.security_token.is_empty() {
            "NOT SET"
        } else {
            "set"
        }
    );
    println!("  model           : {} via {}", config.model.name, config.model.base_url);
    println!(
        "  model api key   : {}",
        if config.model.api_key.is_empty() {
            "NOT SET"
        } else {
            "set"
        }
    );
    println!("  memory backend  : {}", config.memory.backend);
    println!("  max iterations  : {}", config.agent.max_iterations);
    println!();

    let (_agent, remote) = super::build_agent(&config).await?;

    print!("Remote service  : ");
    if remote.reachable().await {
        println!("reachable");
    } else {
        println!("UNREACHABLE — check remote.base_url and that the service is running");
    }

    Ok(())
}
