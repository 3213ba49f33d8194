//! Continuous classify/route/publish loop (§4.3 classifier contract,
//! §4.5 routing, §4.5/§6 delivery).
//!
//! Polls `raw_content` for pending rows, classifies each one, derives
//! its Layer 1/Layer 2 deliveries, and publishes them over Redis. Any
//! number of these can run concurrently: `list_pending_classification`
//! is a plain read, so double-classification of the same row is
//! possible under concurrency and is treated as a harmless re-publish
//! (the publish-history `ON CONFLICT DO NOTHING` absorbs it).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use nc_config::AppConfig;
use nc_domain::{ClassificationStatus, ContentType, RawContent};
use nc_extract::{ClassificationRequest, ClassifierClient, HttpClassifierClient};
use nc_router::{route as compute_route, ChannelStatsRegistry, Publisher, RouteCandidate};
use nc_storage::{ChannelRepository, ContentRepository, PublishHistoryRepository, RouteRepository};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nc_common::logging::init_logging("nc-router-worker");

    info!("starting newsroom pipeline router worker");

    let config = AppConfig::load()?;
    config.validate()?;

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let pool = nc_storage::connect(&config.database.url, config.database.max_connections, config.database.min_connections).await?;
    info!("connected to postgres");

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis = redis_client.get_connection_manager().await?;
    info!("connected to redis");

    let content = Arc::new(ContentRepository::new(pool.clone()));
    let routes = Arc::new(RouteRepository::new(pool.clone()));
    let channels = Arc::new(ChannelRepository::new(pool.clone()));
    let history = PublishHistoryRepository::new(pool.clone());
    let stats = Arc::new(ChannelStatsRegistry::new());

    match &config.extract.classifier_endpoint {
        Some(endpoint) => {
            let classifier = Arc::new(HttpClassifierClient::new(
                endpoint.clone(),
                Duration::from_millis(config.extract.classifier_timeout_ms),
            ));
            let publisher = Publisher::new(redis, history, stats, &config.router);
            spawn_classify_loop(classifier, content, routes, channels, publisher);
        }
        None => {
            warn!("extract.classifier_endpoint is unset, router worker will not classify or publish anything");
        }
    }

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
    info!(%addr, "router worker health/metrics server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("router worker shut down");
    Ok(())
}

fn spawn_classify_loop(
    classifier: Arc<HttpClassifierClient>,
    content: Arc<ContentRepository>,
    routes: Arc<RouteRepository>,
    channels: Arc<ChannelRepository>,
    mut publisher: Publisher,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(2));
        loop {
            ticker.tick().await;

            let pending = match content.list_pending_classification(50).await {
                Ok(rows) => rows,
                Err(error) => {
                    error!(%error, "failed to list pending classification rows");
                    continue;
                }
            };

            for raw in pending {
                if let Err(error) =
                    classify_route_publish(&raw, &classifier, &content, &routes, &channels, &mut publisher).await
                {
                    error!(%error, article_id = %raw.id, "classify/route/publish failed");
                }
            }
        }
    });
}

async fn classify_route_publish(
    raw: &RawContent,
    classifier: &HttpClassifierClient,
    content: &ContentRepository,
    routes: &RouteRepository,
    channels: &ChannelRepository,
    publisher: &mut Publisher,
) -> anyhow::Result<()> {
    let request = ClassificationRequest::from(raw);

    let response = match classifier.classify(&request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, article_id = %raw.id, "classification request failed");
            content.mark_classification_status(&raw.id, ClassificationStatus::Failed).await?;
            metrics::counter!("router.classification.failed_total").increment(1);
            return Ok(());
        }
    };

    let tags = raw.keywords.clone();
    let intro = raw.description.clone();
    let byline = raw.author.clone();
    let article = response.into_article(raw.clone(), tags, intro, byline);

    content.insert_article(&article).await?;
    metrics::counter!("router.classification.succeeded_total").increment(1);

    let enabled_routes = routes.find_enabled_for_source(article.raw.source_id).await?;

    let mut candidate_rows = Vec::with_capacity(enabled_routes.len());
    for route in &enabled_routes {
        match channels.find_by_id(route.channel_id).await? {
            Some(channel) => candidate_rows.push((channel, route)),
            None => warn!(route_id = %route.id, channel_id = %route.channel_id, "route points at a missing channel, skipping"),
        }
    }
    let candidates: Vec<RouteCandidate<'_>> =
        candidate_rows.iter().map(|(channel, route)| RouteCandidate { channel, route: *route }).collect();

    let deliveries = compute_route(&article, ContentType::Article, &candidates);
    if deliveries.is_empty() {
        return Ok(());
    }

    let outcomes = publisher.publish_all(&article, &deliveries).await;
    info!(article_id = %article.raw.id, deliveries = deliveries.len(), outcomes = ?outcomes, "publish attempt complete");

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
