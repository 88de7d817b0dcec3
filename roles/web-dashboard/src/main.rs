use std::{sync::Arc, time::Duration};

use tracing::info;

use web_dashboard::{
    config::Config,
    endpoints::EndpointClient,
    poller::Poller,
    render::RenderSettings,
    web::{self, WebSettings},
    DashboardStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_args()?;

    // Setup tracing with optional file output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt().with_env_filter(env_filter);

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| format!("Failed to open log file {}: {}", log_file.display(), e))?;
        fmt_layer.with_writer(Arc::new(file)).init();
    } else {
        fmt_layer.init();
    }

    info!("Starting web-dashboard service");
    info!("Miner summary URL: {}", config.endpoints.miner_summary);
    info!("Pool stats URL: {}", config.endpoints.pool_stats);
    info!("Network stats URL: {}", config.endpoints.network_stats);
    info!(
        "Min payout threshold URL: {}",
        config.endpoints.min_payout_threshold
    );
    info!("History log URL: {}", config.endpoints.history);
    info!("Web server address: {}", config.web_server_address);
    info!("Polling interval: {} seconds", config.poll_interval_secs);
    info!(
        "Chain: {}s blocks, {} atomic units per {}",
        config.chain.block_time_secs, config.chain.atomic_units_per_coin, config.ticker
    );

    let client = EndpointClient::new(&config)?;
    let store = Arc::new(DashboardStore::new());
    let poller = Arc::new(Poller::new(
        client,
        store.clone(),
        RenderSettings::from(&config),
    ));

    // Spawn polling loop
    tokio::spawn(
        poller
            .clone()
            .run(Duration::from_secs(config.poll_interval_secs)),
    );

    web::run_http_server(
        config.web_server_address.clone(),
        store,
        poller,
        WebSettings::from(&config),
    )
    .await?;

    Ok(())
}
