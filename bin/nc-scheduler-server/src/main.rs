//! Newsroom pipeline job scheduler: due-job dispatch, stale-execution
//! recovery, and event-triggered job dispatch, gated on leader election
//! (§4.1, §5).

mod event_bridge;
mod runner;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use nc_config::AppConfig;
use nc_domain::layer1_channel_name;
use nc_scheduler::{EventDispatcher, SchedulerService, StaleExecutionRecovery};
use nc_standby::{LeaderElection, LeaderElectionConfig, StandbyGuard};
use nc_storage::{ChannelRepository, FrontierRepository, JobExecutionRepository, JobRepository, LeaderLeaseRepository, ProcessedEventRepository, SourceRepository};
use runner::SeedingJobRunner;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nc_common::logging::init_logging("nc-scheduler-server");

    info!("starting newsroom pipeline scheduler");

    let config = AppConfig::load()?;
    config.validate()?;

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let pool = nc_storage::connect(&config.database.url, config.database.max_connections, config.database.min_connections).await?;
    info!("connected to postgres");

    let sources = Arc::new(SourceRepository::new(pool.clone()));
    let jobs = Arc::new(JobRepository::new(pool.clone()));
    let executions = Arc::new(JobExecutionRepository::new(pool.clone()));
    let frontier = Arc::new(FrontierRepository::new(pool.clone()));
    let channels = Arc::new(ChannelRepository::new(pool.clone()));
    let processed_events = Arc::new(ProcessedEventRepository::new(pool.clone()));
    let leases = Arc::new(LeaderLeaseRepository::new(pool.clone()));

    let election_config = LeaderElectionConfig {
        lease_name: config.standby.lease_name.clone(),
        lease_ttl_secs: config.standby.lease_ttl_secs,
        refresh_interval_secs: config.standby.refresh_interval_secs,
        instance_id: if config.standby.instance_id.is_empty() { uuid::Uuid::new_v4().to_string() } else { config.standby.instance_id.clone() },
    };
    let election = Arc::new(LeaderElection::new(election_config, leases));
    if config.standby.enabled {
        election.clone().start()?;
    }
    let guard = Arc::new(StandbyGuard::new(election.clone()));

    let runner = Arc::new(SeedingJobRunner::new(sources.clone(), frontier.clone(), Duration::from_millis(500)));
    let scheduler = Arc::new(SchedulerService::new(config.scheduler.clone(), jobs.clone(), executions.clone(), runner));
    let stale_recovery = Arc::new(StaleExecutionRecovery::new(config.scheduler.clone(), jobs.clone(), executions.clone()));
    let dispatcher = Arc::new(EventDispatcher::new(jobs.clone(), processed_events.clone()));

    spawn_poll_loop(scheduler, guard.clone(), Duration::from_millis(config.scheduler.poll_interval_ms));
    spawn_stale_recovery_loop(stale_recovery, guard.clone(), Duration::from_secs(config.scheduler.stale_threshold_minutes.max(1) as u64 * 30));
    spawn_processed_event_pruner(processed_events);
    spawn_event_bridge(&config, channels, dispatcher, guard);

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
    info!(%addr, "scheduler health/metrics server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(election)).await?;

    info!("scheduler shut down");
    Ok(())
}

fn spawn_poll_loop<R: nc_scheduler::JobRunner + 'static>(
    scheduler: Arc<SchedulerService<R>>,
    guard: Arc<StandbyGuard>,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(50)));
        loop {
            ticker.tick().await;
            if !guard.should_process() {
                continue;
            }
            if let Err(error) = scheduler.poll_once().await {
                error!(%error, "scheduler poll failed");
            }
        }
    });
}

fn spawn_stale_recovery_loop(recovery: Arc<StaleExecutionRecovery>, guard: Arc<StandbyGuard>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if !guard.should_process() {
                continue;
            }
            if let Err(error) = recovery.recover().await {
                error!(%error, "stale execution recovery failed");
            }
        }
    });
}

fn spawn_processed_event_pruner(processed_events: Arc<nc_storage::ProcessedEventRepository>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            let before = chrono::Utc::now() - chrono::Duration::days(7);
            match processed_events.prune_older_than(before).await {
                Ok(pruned) if pruned > 0 => info!(pruned, "pruned processed-event ledger"),
                Ok(_) => {}
                Err(error) => error!(%error, "failed to prune processed-event ledger"),
            }
        }
    });
}

fn spawn_event_bridge(config: &AppConfig, channels: Arc<ChannelRepository>, dispatcher: Arc<EventDispatcher>, guard: Arc<StandbyGuard>) {
    let redis_url = config.redis.url.clone();
    tokio::spawn(async move {
        loop {
            let channel_names = match build_channel_list(&channels).await {
                Ok(names) => names,
                Err(error) => {
                    warn!(%error, "failed to list channels for event dispatch, retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    continue;
                }
            };

            if guard.should_process() {
                if let Err(error) = event_bridge::run(&redis_url, channel_names, dispatcher.clone()).await {
                    warn!(%error, "event dispatch bridge stopped, reconnecting in 5s");
                }
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });
}

async fn build_channel_list(channels: &ChannelRepository) -> nc_storage::Result<Vec<String>> {
    let mut names: Vec<String> = nc_scheduler_known_topics().into_iter().map(|t| layer1_channel_name(t)).collect();
    for channel in channels.list_enabled().await? {
        names.push(channel.redis_channel);
    }
    Ok(names)
}

/// The fixed Layer 1 topic vocabulary (mirrors `nc_router::KNOWN_TOPICS`).
/// Duplicated here rather than depending on `nc-router` just for one
/// constant, since this binary otherwise has no reason to link the
/// router crate.
fn nc_scheduler_known_topics() -> &'static [&'static str] {
    &[
        "business",
        "criminal_justice",
        "drug_crime",
        "education",
        "entertainment",
        "health",
        "local_news",
        "organized_crime",
        "politics",
        "property_crime",
        "sports",
        "technology",
        "violent_crime",
        "weather",
    ]
}

async fn shutdown_signal(election: Arc<LeaderElection>) {
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

    election.shutdown().await;
}
