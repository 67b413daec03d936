use payflow::{
    api::{self, admin},
    core::{config::Config, logging::init_logging, prelude::*},
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env();
    init_logging(&config);

    let state = AppState::from_config(&config);
    if config.seed_demo {
        match admin::reset_state(&state, true).await {
            Ok(report) => info!(seeded = report.seeded.len(), "demo data loaded"),
            Err(err) => error!(error = %err, "demo data not loaded"),
        }
    }

    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(
        addr = %listener.local_addr()?,
        settlement = ?config.settlement,
        seeded_rng = config.rng_seed.is_some(),
        "payflow listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.simulator.abort_all();
    info!("payflow stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
