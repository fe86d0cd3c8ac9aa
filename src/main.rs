//! IT news ranker: binary entrypoint.
//! Boots the Axum HTTP server and the periodic feed fetcher.

use it_news_ranker::{build_app_state, metrics::Metrics, router, spawn_periodic, AppConfig};
use shuttle_axum::ShuttleAxum;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    // The runtime may already have installed a global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default()?;
    let state = build_app_state(&cfg).await?;
    let metrics = Metrics::init(cfg.fetch_interval_secs)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_periodic(Arc::clone(&state.fetcher), shutdown_rx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested, stopping fetcher");
        }
        let _ = shutdown_tx.send(true);
    });

    let app = router(state).merge(metrics.router());
    Ok(app.into())
}
