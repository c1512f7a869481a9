use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod stats;
mod upstream;

use api::dashboard::Dashboard;
use api::server::AppState;
use stats::{OperatorStatsEngine, StatsQuery};
use upstream::{HttpSupportApi, SnapshotCache};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();

    let support = Arc::new(HttpSupportApi::new(
        reqwest::Client::new(),
        config.support_api_url.clone(),
        config.deposits_api_url.clone(),
        config.support_api_token.clone(),
        config.engine.request_timeout,
    ));

    let snapshots = SnapshotCache::new(support.clone());
    match snapshots.refresh().await {
        Ok(count) => tracing::info!("Loaded chat snapshot: {count} chats"),
        Err(e) => tracing::warn!("Initial chat snapshot failed: {e}"),
    }
    tokio::spawn(snapshots.clone().run_refresher(config.snapshot_refresh));

    let engine = Arc::new(OperatorStatsEngine::new(
        config.engine.clone(),
        Arc::new(snapshots.clone()),
        support.clone(),
        support,
    ));
    let dashboard = Arc::new(Dashboard::new(engine, StatsQuery::range(config.default_range)));
    tokio::spawn(dashboard.clone().run_refresher(config.stats_refresh));

    tracing::info!(
        "Aggregating operator stats from {} with {} workers",
        config.support_api_url,
        config.engine.workers
    );

    api::server::run(AppState { dashboard, snapshots }, config.port).await;
}
