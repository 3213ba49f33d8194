//! Admin REST API process: sources, jobs, channels, routes, publish
//! history, stats, and the realtime SSE event stream (§4.6, §6).
//!
//! Talks to the same Postgres database and repositories every other
//! worker binary in this workspace uses; it never holds pipeline state
//! of its own beyond the in-process event bus it bridges via
//! `JobChangePoller`.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use nc_api::AppState;
use nc_config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nc_common::logging::init_logging("nc-api-server");

    info!("starting newsroom pipeline admin API");

    let config = AppConfig::load()?;
    config.validate()?;

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let pool = nc_storage::connect(&config.database.url, config.database.max_connections, config.database.min_connections).await?;
    info!("connected to postgres");

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis = redis_client.get_connection_manager().await?;
    info!("connected to redis");

    let state = AppState::new(pool, redis, config.auth.admin_token.clone());
    state.spawn_event_poller();

    let app = nc_api::build_router(state).route(
        "/metrics",
        axum::routing::get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    info!(%addr, "admin API listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("admin API shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
