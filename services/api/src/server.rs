use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryJourneyRepository};
use crate::routes::with_journey_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use life_assist::config::AppConfig;
use life_assist::error::AppError;
use life_assist::telemetry;
use life_assist::workflows::journeys::{
    JourneyRepository, JourneyService, SimulatedExecutor, SubmissionExecutor,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let cleanup_interval = config.journeys.cleanup_interval;
    let journey_service = Arc::new(JourneyService::new(
        Arc::new(InMemoryJourneyRepository::default()),
        Arc::new(SimulatedExecutor::new()),
        config.journeys.clone(),
    ));
    let cleanup_task = spawn_cleanup(journey_service.clone(), cleanup_interval);

    let app = with_journey_routes(journey_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "life-event journey service ready");

    let served = axum::serve(listener, app).await;
    cleanup_task.abort();
    served?;
    Ok(())
}

/// Periodically purges expired intakes and consent grants off the request path.
fn spawn_cleanup<R, E>(service: Arc<JourneyService<R, E>>, every: Duration) -> JoinHandle<()>
where
    R: JourneyRepository + 'static,
    E: SubmissionExecutor + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.cleanup() {
                Ok(report) => info!(
                    vault_records_purged = report.vault_records_purged,
                    consent_grants_purged = report.consent_grants_purged,
                    "journey cleanup completed"
                ),
                Err(error) => warn!(kind = error.kind().label(), %error, "journey cleanup failed"),
            }
        }
    })
}
