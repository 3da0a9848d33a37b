use crate::cli::ServeArgs;
use crate::infra::{
    seed_demo_properties, AppState, InMemoryLetterStore, InMemoryPlanStore,
    InMemoryPropertyRegistry, InMemoryReservationStore, InMemorySaleStore,
    LogNotificationPublisher,
};
use crate::routes::with_engine_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate_flow::config::AppConfig;
use estate_flow::error::AppError;
use estate_flow::telemetry;
use estate_flow::workflows::transactions::{
    LetterService, PlanService, ReservationService, SaleService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registry = Arc::new(InMemoryPropertyRegistry::default());
    seed_demo_properties(&registry);
    let reservation_rows = Arc::new(InMemoryReservationStore::default());
    let sale_rows = Arc::new(InMemorySaleStore::default());
    let letter_rows = Arc::new(InMemoryLetterStore::default());
    let plan_rows = Arc::new(InMemoryPlanStore::default());
    let notifier = Arc::new(LogNotificationPublisher);

    let reservations = Arc::new(ReservationService::new(
        reservation_rows.clone(),
        registry.clone(),
        notifier.clone(),
    ));
    let sales = Arc::new(SaleService::new(
        sale_rows.clone(),
        reservation_rows,
        registry,
        notifier.clone(),
    ));
    let letters = Arc::new(LetterService::new(
        letter_rows,
        sale_rows.clone(),
        notifier.clone(),
    ));
    let plans = Arc::new(PlanService::new(plan_rows, sale_rows, notifier));

    let app = with_engine_routes(reservations, sales, letters, plans)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "transaction engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
