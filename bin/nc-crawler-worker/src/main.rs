//! Continuous frontier claim/fetch/extract/validate loop (§4.2–§4.4).
//!
//! Any number of these can run concurrently against the same Postgres
//! database: `FrontierRepository::claim_batch`'s `FOR UPDATE SKIP
//! LOCKED` already prevents double-claims, so unlike the scheduler this
//! binary needs no leader election.

mod discovery;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use nc_config::AppConfig;
use nc_domain::{DiscoveredLink, FrontierStatus};
use nc_extract::{Extractor, Validator};
use nc_frontier::{FrontierService, PolitenessGate, RobotsCache};
use nc_storage::{ContentRepository, DiscoveredLinkRepository, FrontierRepository, HostStateRepository, SourceRepository};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nc_common::logging::init_logging("nc-crawler-worker");

    info!("starting newsroom pipeline crawler worker");

    let config = AppConfig::load()?;
    config.validate()?;

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let pool = nc_storage::connect(&config.database.url, config.database.max_connections, config.database.min_connections).await?;
    info!("connected to postgres");

    let sources = Arc::new(SourceRepository::new(pool.clone()));
    let frontier = Arc::new(FrontierRepository::new(pool.clone()));
    let content = Arc::new(ContentRepository::new(pool.clone()));
    let discovered_links = Arc::new(DiscoveredLinkRepository::new(pool.clone()));

    let robots_http = reqwest::Client::builder()
        .user_agent(config.frontier.user_agent.clone())
        .timeout(Duration::from_millis(config.frontier.fetch_timeout_ms))
        .build()?;
    let politeness = Arc::new(PolitenessGate::new(HostStateRepository::new(pool.clone()), FrontierRepository::new(pool.clone())));
    let robots = Arc::new(RobotsCache::new(HostStateRepository::new(pool.clone()), robots_http, config.frontier.user_agent.clone()));

    let instance_id = uuid::Uuid::new_v4().to_string();
    let frontier_service =
        Arc::new(FrontierService::new(frontier.clone(), politeness, robots, config.frontier.clone(), instance_id));

    spawn_crawl_loop(frontier_service.clone(), sources.clone(), frontier.clone(), content.clone(), discovered_links.clone());
    spawn_stale_lease_sweeper(frontier_service);

    let app = axum::Router::new()
        .route("/health", axum::routing::get(|| async { axum::Json(serde_json::json!({"status": "UP"})) }))
        .route(
            "/metrics",
            axum::routing::get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    info!(%addr, "crawler worker health/metrics server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("crawler worker shut down");
    Ok(())
}

fn spawn_crawl_loop(
    frontier_service: Arc<FrontierService>,
    sources: Arc<SourceRepository>,
    frontier: Arc<FrontierRepository>,
    content: Arc<ContentRepository>,
    discovered_links: Arc<DiscoveredLinkRepository>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            let pages = match frontier_service.claim_and_fetch_batch().await {
                Ok(pages) => pages,
                Err(error) => {
                    error!(%error, "frontier claim/fetch batch failed");
                    continue;
                }
            };

            for page in pages {
                let source = match sources.find_by_id(page.frontier_url.source_id).await {
                    Ok(Some(source)) => source,
                    Ok(None) => {
                        warn!(source_id = %page.frontier_url.source_id, "fetched page for unknown source, skipping");
                        continue;
                    }
                    Err(error) => {
                        error!(%error, "failed to load source for fetched page");
                        continue;
                    }
                };

                if !source.enabled {
                    continue;
                }

                for discovered in discovery::discover_links(&page.body, &page.frontier_url.url, &source) {
                    let link = DiscoveredLink {
                        id: Uuid::new_v4(),
                        source_id: source.id,
                        url: discovered.url.clone(),
                        parent_url: Some(page.frontier_url.url.clone()),
                        depth: page.frontier_url.depth + 1,
                        discovered_at: Utc::now(),
                        queued_at: None,
                        priority: page.frontier_url.priority,
                        status: FrontierStatus::Pending,
                    };
                    if let Err(error) = discovered_links.record(&link).await {
                        warn!(%error, url = %link.url, "failed to record discovered link");
                        continue;
                    }
                    let Some(frontier_url) =
                        discovery::to_frontier_url(&discovered, &source, &page.frontier_url.url, page.frontier_url.depth)
                    else {
                        continue;
                    };
                    if let Err(error) = frontier.upsert(&frontier_url).await {
                        warn!(%error, url = %frontier_url.url, "failed to enqueue discovered link");
                        continue;
                    }
                    if let Err(error) = discovered_links.mark_queued(source.id, &discovered.url, Utc::now()).await {
                        warn!(%error, url = %discovered.url, "failed to mark discovered link as queued");
                    }
                }

                let raw_content =
                    Extractor::extract(&page.body, &page.frontier_url.url, source.id, &source.name, &source.selectors);

                match Validator::validate(&raw_content) {
                    Ok(()) => {
                        if let Err(error) = content.upsert_raw(&raw_content).await {
                            error!(%error, url = %page.frontier_url.url, "failed to index raw content");
                        } else {
                            metrics::counter!("crawler.articles.indexed_total").increment(1);
                        }
                    }
                    Err(reason) => {
                        metrics::counter!("crawler.articles.rejected_total", "reason" => reason.counter_name()).increment(1);
                        info!(url = %page.frontier_url.url, reason = reason.counter_name(), "extracted content rejected by validator");
                    }
                }
            }
        }
    });
}

fn spawn_stale_lease_sweeper(frontier_service: Arc<FrontierService>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            match frontier_service.sweep_stale_leases().await {
                Ok(swept) if swept > 0 => info!(swept, "swept stale frontier leases"),
                Ok(_) => {}
                Err(error) => error!(%error, "failed to sweep stale frontier leases"),
            }
        }
    });
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
