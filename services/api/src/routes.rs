use crate::infra::{
    AppState, InMemoryLetterStore, InMemoryPlanStore, InMemoryPropertyRegistry,
    InMemoryReservationStore, InMemorySaleStore, LogNotificationPublisher,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use estate_flow::workflows::transactions::{
    letter_router, plan_router, reservation_router, sale_router, LetterService, PlanService,
    ReservationService, SaleService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) type Reservations =
    ReservationService<InMemoryReservationStore, InMemoryPropertyRegistry, LogNotificationPublisher>;
pub(crate) type Sales = SaleService<
    InMemorySaleStore,
    InMemoryReservationStore,
    InMemoryPropertyRegistry,
    LogNotificationPublisher,
>;
pub(crate) type Letters =
    LetterService<InMemoryLetterStore, InMemorySaleStore, LogNotificationPublisher>;
pub(crate) type Plans = PlanService<InMemoryPlanStore, InMemorySaleStore, LogNotificationPublisher>;

pub(crate) fn with_engine_routes(
    reservations: Arc<Reservations>,
    sales: Arc<Sales>,
    letters: Arc<Letters>,
    plans: Arc<Plans>,
) -> axum::Router {
    reservation_router(reservations)
        .merge(sale_router(sales))
        .merge(letter_router(letters))
        .merge(plan_router(plans))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
