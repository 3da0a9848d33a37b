//! Transaction and allocation engine for the sales operation.
//!
//! Reservations, sales, offer/allocation letters, and installment plans are
//! kept mutually consistent with the property registry through trait seams:
//! the registry exposes a compare-and-swap over `(status, hold)`, the stores
//! enforce single-active-record uniqueness, and the notification dispatcher
//! is fire-and-forget.

pub mod audit;
pub mod domain;
pub mod letters;
pub mod notify;
pub mod plans;
pub mod policy;
pub mod registry;
pub mod reservations;
pub mod router;
pub mod sales;
pub mod store;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditActor, AuditEntry, AuditTrail};
pub use domain::{
    Actor, ActorRole, ClientSnapshot, HoldRef, LetterId, Money, PlanId, PropertyKind,
    PropertyRecord, PropertyRef, PropertyStatus, ReservationId, SaleId,
};
pub use letters::{Letter, LetterDecision, LetterError, LetterKind, LetterService, LetterStatus};
pub use notify::{
    DispatchError, NotificationCategory, NotificationChannel, NotificationMessage,
    NotificationPublisher,
};
pub use plans::{
    CreatePlanRequest, PaymentPlan, PlanError, PlanFrequency, PlanService, PlanStatus,
};
pub use policy::{allowed_roles, can_perform, Operation};
pub use registry::{PropertyRegistry, PropertyState, RegistryError};
pub use reservations::{
    Reservation, ReservationCode, ReservationDecision, ReservationError, ReservationService,
    ReservationStatus, ReserveRequest,
};
pub use router::{
    letter_router, plan_router, reservation_router, sale_router, ApiEnvelope, FailureKind,
};
pub use sales::{
    ApprovalTerms, CreateSaleRequest, FeeAmounts, FeeLine, FeeSchedule, LetterLink, PaymentInput,
    PaymentMethod, PaymentStatus, PaymentTarget, Sale, SaleError, SaleService, SaleStatus,
};
pub use store::{LetterStore, PlanStore, ReservationStore, SaleStore, StoreError};
