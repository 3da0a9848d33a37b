//! Thin HTTP surface over the engine services: one route per operation,
//! uniform `{success, message, payload}` envelope, and the status mapping
//! that separates business-rule rejections from internal failures.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, ClientSnapshot, LetterId, PlanId, PropertyRef, ReservationId, SaleId,
};
use super::letters::{LetterDecision, LetterError, LetterKind, LetterService};
use super::notify::NotificationPublisher;
use super::plans::{CreatePlanRequest, PlanError, PlanService};
use super::registry::PropertyRegistry;
use super::reservations::{
    ReservationDecision, ReservationError, ReservationService, ReserveRequest,
};
use super::sales::{ApprovalTerms, CreateSaleRequest, PaymentInput, SaleError, SaleService};
use super::store::{LetterStore, PlanStore, ReservationStore, SaleStore};

/// Classification used to translate service failures onto HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    PermissionDenied,
    StateConflict,
    Validation,
    Internal,
}

const fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::PermissionDenied => StatusCode::FORBIDDEN,
        FailureKind::StateConflict | FailureKind::Validation => StatusCode::BAD_REQUEST,
        FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wire envelope shared by every engine endpoint.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

trait EngineFailure: std::fmt::Display {
    fn kind(&self) -> FailureKind;
}

impl EngineFailure for ReservationError {
    fn kind(&self) -> FailureKind {
        self.failure_kind()
    }
}

impl EngineFailure for SaleError {
    fn kind(&self) -> FailureKind {
        self.failure_kind()
    }
}

impl EngineFailure for LetterError {
    fn kind(&self) -> FailureKind {
        self.failure_kind()
    }
}

impl EngineFailure for PlanError {
    fn kind(&self) -> FailureKind {
        self.failure_kind()
    }
}

fn engine_response<T, E>(result: Result<T, E>, status: StatusCode, message: &str) -> Response
where
    T: Serialize,
    E: EngineFailure,
{
    match result {
        Ok(value) => {
            let payload = serde_json::to_value(&value)
                .ok()
                .filter(|value| !value.is_null());
            (
                status,
                Json(ApiEnvelope {
                    success: true,
                    message: message.to_string(),
                    payload,
                }),
            )
                .into_response()
        }
        Err(err) => failure_response(err.kind(), err.to_string()),
    }
}

fn failure_response(kind: FailureKind, message: String) -> Response {
    let message = if kind == FailureKind::Internal {
        tracing::error!(%message, "engine operation failed");
        "unexpected error, please retry".to_string()
    } else {
        message
    };
    (
        status_for(kind),
        Json(ApiEnvelope {
            success: false,
            message,
            payload: None,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Reservations

#[derive(Debug, Deserialize)]
struct ReserveBody {
    property: PropertyRef,
    client: ClientSnapshot,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    status: String,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct ActorBody {
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct ValidateBody {
    property: PropertyRef,
    code: String,
}

pub fn reservation_router<S, R, N>(service: Arc<ReservationService<S, R, N>>) -> Router
where
    S: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/reservations", post(reserve_handler::<S, R, N>))
        .route(
            "/api/v1/reservations/validate",
            post(validate_handler::<S, R, N>),
        )
        .route(
            "/api/v1/reservations/:id/status",
            post(reservation_status_handler::<S, R, N>),
        )
        .route(
            "/api/v1/reservations/:id",
            delete(reservation_cancel_handler::<S, R, N>),
        )
        .with_state(service)
}

async fn reserve_handler<S, R, N>(
    State(service): State<Arc<ReservationService<S, R, N>>>,
    Json(body): Json<ReserveBody>,
) -> Response
where
    S: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    let request = ReserveRequest {
        property: body.property,
        client: body.client,
    };
    engine_response(
        service.reserve(request, &body.actor),
        StatusCode::CREATED,
        "reservation created",
    )
}

async fn validate_handler<S, R, N>(
    State(service): State<Arc<ReservationService<S, R, N>>>,
    Json(body): Json<ValidateBody>,
) -> Response
where
    S: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.validate(&body.property, &body.code),
        StatusCode::OK,
        "reservation valid",
    )
}

async fn reservation_status_handler<S, R, N>(
    State(service): State<Arc<ReservationService<S, R, N>>>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Response
where
    S: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    let decision = match parse_reservation_decision(&body.status) {
        Some(decision) => decision,
        None => {
            return failure_response(
                FailureKind::Validation,
                format!("invalid status '{}'", body.status),
            )
        }
    };
    engine_response(
        service.change_status(&ReservationId(id), decision, &body.actor),
        StatusCode::OK,
        "reservation updated",
    )
}

async fn reservation_cancel_handler<S, R, N>(
    State(service): State<Arc<ReservationService<S, R, N>>>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Response
where
    S: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.cancel(&ReservationId(id), &body.actor),
        StatusCode::OK,
        "reservation cancelled",
    )
}

fn parse_reservation_decision(raw: &str) -> Option<ReservationDecision> {
    match raw.to_ascii_uppercase().as_str() {
        "APPROVED" => Some(ReservationDecision::Approved),
        "DECLINED" => Some(ReservationDecision::Declined),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Sales

#[derive(Debug, Deserialize)]
struct CreateSaleBody {
    #[serde(flatten)]
    request: CreateSaleRequest,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct ApproveSaleBody {
    #[serde(flatten)]
    terms: ApprovalTerms,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct DeclineSaleBody {
    #[serde(default)]
    remark: String,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    #[serde(flatten)]
    payment: PaymentInput,
    actor: Actor,
}

pub fn sale_router<S, RS, R, N>(service: Arc<SaleService<S, RS, R, N>>) -> Router
where
    S: SaleStore + 'static,
    RS: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/sales", post(sale_create_handler::<S, RS, R, N>))
        .route(
            "/api/v1/sales/:id/approve",
            post(sale_approve_handler::<S, RS, R, N>),
        )
        .route(
            "/api/v1/sales/:id/decline",
            post(sale_decline_handler::<S, RS, R, N>),
        )
        .route(
            "/api/v1/sales/:id/payments",
            post(sale_payment_handler::<S, RS, R, N>),
        )
        .with_state(service)
}

async fn sale_create_handler<S, RS, R, N>(
    State(service): State<Arc<SaleService<S, RS, R, N>>>,
    Json(body): Json<CreateSaleBody>,
) -> Response
where
    S: SaleStore + 'static,
    RS: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.create(body.request, &body.actor),
        StatusCode::CREATED,
        "sale created",
    )
}

async fn sale_approve_handler<S, RS, R, N>(
    State(service): State<Arc<SaleService<S, RS, R, N>>>,
    Path(id): Path<String>,
    Json(body): Json<ApproveSaleBody>,
) -> Response
where
    S: SaleStore + 'static,
    RS: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.approve(&SaleId(id), body.terms, &body.actor),
        StatusCode::OK,
        "sale approved",
    )
}

async fn sale_decline_handler<S, RS, R, N>(
    State(service): State<Arc<SaleService<S, RS, R, N>>>,
    Path(id): Path<String>,
    Json(body): Json<DeclineSaleBody>,
) -> Response
where
    S: SaleStore + 'static,
    RS: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.decline(&SaleId(id), &body.remark, &body.actor),
        StatusCode::OK,
        "sale declined",
    )
}

async fn sale_payment_handler<S, RS, R, N>(
    State(service): State<Arc<SaleService<S, RS, R, N>>>,
    Path(id): Path<String>,
    Json(body): Json<PaymentBody>,
) -> Response
where
    S: SaleStore + 'static,
    RS: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.record_payment(&SaleId(id), body.payment, &body.actor),
        StatusCode::OK,
        "payment recorded",
    )
}

// ---------------------------------------------------------------------------
// Offer and allocation letters

#[derive(Debug, Deserialize)]
struct IssueLetterBody {
    file_url: String,
    actor: Actor,
}

pub fn letter_router<L, S, N>(service: Arc<LetterService<L, S, N>>) -> Router
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/sales/:id/offer", post(issue_offer_handler::<L, S, N>))
        .route(
            "/api/v1/sales/:id/allocation",
            post(issue_allocation_handler::<L, S, N>),
        )
        .route(
            "/api/v1/offers/:id/status",
            post(offer_status_handler::<L, S, N>),
        )
        .route(
            "/api/v1/allocations/:id/status",
            post(allocation_status_handler::<L, S, N>),
        )
        .route("/api/v1/offers/:id", delete(offer_delete_handler::<L, S, N>))
        .route(
            "/api/v1/allocations/:id",
            delete(allocation_delete_handler::<L, S, N>),
        )
        .with_state(service)
}

fn issue_letter<L, S, N>(
    service: &LetterService<L, S, N>,
    kind: LetterKind,
    id: String,
    body: IssueLetterBody,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.issue(kind, &SaleId(id), body.file_url, &body.actor),
        StatusCode::CREATED,
        "letter issued",
    )
}

fn letter_status<L, S, N>(
    service: &LetterService<L, S, N>,
    kind: LetterKind,
    id: String,
    body: DecisionBody,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    let decision = match parse_letter_decision(&body.status) {
        Some(decision) => decision,
        None => {
            return failure_response(
                FailureKind::Validation,
                format!("invalid status '{}'", body.status),
            )
        }
    };
    engine_response(
        service.change_status(kind, &LetterId(id), decision, &body.actor),
        StatusCode::OK,
        "letter updated",
    )
}

fn letter_delete<L, S, N>(
    service: &LetterService<L, S, N>,
    kind: LetterKind,
    id: String,
    body: ActorBody,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.delete(kind, &LetterId(id), &body.actor),
        StatusCode::OK,
        "letter deleted",
    )
}

async fn issue_offer_handler<L, S, N>(
    State(service): State<Arc<LetterService<L, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<IssueLetterBody>,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    issue_letter(service.as_ref(), LetterKind::Offer, id, body)
}

async fn issue_allocation_handler<L, S, N>(
    State(service): State<Arc<LetterService<L, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<IssueLetterBody>,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    issue_letter(service.as_ref(), LetterKind::Allocation, id, body)
}

async fn offer_status_handler<L, S, N>(
    State(service): State<Arc<LetterService<L, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    letter_status(service.as_ref(), LetterKind::Offer, id, body)
}

async fn allocation_status_handler<L, S, N>(
    State(service): State<Arc<LetterService<L, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    letter_status(service.as_ref(), LetterKind::Allocation, id, body)
}

async fn offer_delete_handler<L, S, N>(
    State(service): State<Arc<LetterService<L, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    letter_delete(service.as_ref(), LetterKind::Offer, id, body)
}

async fn allocation_delete_handler<L, S, N>(
    State(service): State<Arc<LetterService<L, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Response
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    letter_delete(service.as_ref(), LetterKind::Allocation, id, body)
}

fn parse_letter_decision(raw: &str) -> Option<LetterDecision> {
    match raw.to_ascii_uppercase().as_str() {
        "APPROVED" => Some(LetterDecision::Approved),
        "CANCELED" => Some(LetterDecision::Canceled),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Payment plans

#[derive(Debug, Deserialize)]
struct CreatePlanBody {
    #[serde(flatten)]
    request: CreatePlanRequest,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct CycleBody {
    #[serde(default)]
    next_custom_date: Option<NaiveDate>,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct CancelPlanBody {
    #[serde(default)]
    remark: String,
    actor: Actor,
}

pub fn plan_router<P, S, N>(service: Arc<PlanService<P, S, N>>) -> Router
where
    P: PlanStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/payment-plans", post(plan_create_handler::<P, S, N>))
        .route(
            "/api/v1/payment-plans/:id/cycles",
            post(plan_cycle_handler::<P, S, N>),
        )
        .route(
            "/api/v1/payment-plans/:id/cancel",
            post(plan_cancel_handler::<P, S, N>),
        )
        .with_state(service)
}

async fn plan_create_handler<P, S, N>(
    State(service): State<Arc<PlanService<P, S, N>>>,
    Json(body): Json<CreatePlanBody>,
) -> Response
where
    P: PlanStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.create(body.request, &body.actor),
        StatusCode::CREATED,
        "payment plan created",
    )
}

async fn plan_cycle_handler<P, S, N>(
    State(service): State<Arc<PlanService<P, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<CycleBody>,
) -> Response
where
    P: PlanStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.record_cycle(&PlanId(id), body.next_custom_date, &body.actor),
        StatusCode::OK,
        "cycle recorded",
    )
}

async fn plan_cancel_handler<P, S, N>(
    State(service): State<Arc<PlanService<P, S, N>>>,
    Path(id): Path<String>,
    Json(body): Json<CancelPlanBody>,
) -> Response
where
    P: PlanStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    engine_response(
        service.cancel(&PlanId(id), &body.remark, &body.actor),
        StatusCode::OK,
        "payment plan cancelled",
    )
}
