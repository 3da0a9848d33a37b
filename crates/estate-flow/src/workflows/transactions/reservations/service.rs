use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::domain::{Reservation, ReservationCode, ReservationDecision, ReservationStatus};
use crate::workflows::transactions::audit::{changed_fields, AuditAction, AuditTrail};
use crate::workflows::transactions::domain::{
    Actor, ActorRole, ClientSnapshot, HoldRef, PropertyRecord, PropertyRef, PropertyStatus,
    ReservationId,
};
use crate::workflows::transactions::notify::{
    fire_and_forget, NotificationCategory, NotificationMessage, NotificationPublisher,
};
use crate::workflows::transactions::policy::{can_perform, Operation};
use crate::workflows::transactions::registry::{PropertyRegistry, PropertyState, RegistryError};
use crate::workflows::transactions::router::FailureKind;
use crate::workflows::transactions::store::{ReservationStore, StoreError};

/// Inbound payload for a new hold.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub property: PropertyRef,
    pub client: ClientSnapshot,
}

static RESERVATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_reservation_id() -> ReservationId {
    let id = RESERVATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReservationId(format!("rsv-{id:06}"))
}

/// Service owning the reservation lifecycle: reserve, review, cancel,
/// validate. Mutations against the registry go through its compare-and-swap
/// so concurrent holds on one property resolve to a single winner.
pub struct ReservationService<S, R, N> {
    store: Arc<S>,
    registry: Arc<R>,
    notifier: Arc<N>,
}

impl<S, R, N> ReservationService<S, R, N>
where
    S: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(store: Arc<S>, registry: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            store,
            registry,
            notifier,
        }
    }

    /// Place a hold on an available property.
    ///
    /// Staff holds are confirmed immediately (`Reserved`); client holds go
    /// under review (`Pending`). The reservation insert and the registry
    /// flip are ordered insert-then-swap with a compensating delete, so two
    /// concurrent requests on the same unit produce exactly one winner.
    pub fn reserve(
        &self,
        request: ReserveRequest,
        actor: &Actor,
    ) -> Result<Reservation, ReservationError> {
        self.ensure_allowed(actor, Operation::ReserveProperty)?;

        let record = self
            .registry
            .fetch(&request.property)?
            .ok_or(ReservationError::PropertyNotFound)?;

        if let Some(existing) = self.store.find_active_by_property(&request.property)? {
            if existing.client.same_client(&request.client) {
                return Err(ReservationError::DuplicateReservation);
            }
            return Err(ReservationError::PropertyAlreadyReserved);
        }

        if record.status != PropertyStatus::Available {
            return Err(ReservationError::PropertyNotAvailable {
                status: record.status,
            });
        }

        let status = if actor.role.is_staff() {
            ReservationStatus::Reserved
        } else {
            ReservationStatus::Pending
        };

        let now = Utc::now();
        let mut reservation = Reservation {
            id: next_reservation_id(),
            property: request.property.clone(),
            client: request.client,
            code: ReservationCode::generate(),
            status,
            audit: AuditTrail::default(),
            created_at: now,
            updated_at: now,
        };
        reservation.audit.record(
            AuditAction::Created,
            changed_fields([("status", status.label().to_string())]),
            actor,
        );

        let stored = self
            .store
            .insert_active(reservation)
            .map_err(|err| match err {
                StoreError::Conflict => ReservationError::PropertyAlreadyReserved,
                other => ReservationError::Store(other),
            })?;

        let next = PropertyState::held(
            PropertyStatus::Reserved,
            HoldRef::Reservation(stored.id.clone()),
        );
        if let Err(err) = self
            .registry
            .transition(&request.property, &PropertyState::available(), next)
        {
            let _ = self.store.delete(&stored.id);
            return Err(match err {
                RegistryError::Conflict { actual } => {
                    ReservationError::PropertyNotAvailable { status: actual }
                }
                other => ReservationError::Registry(other),
            });
        }

        fire_and_forget(self.notifier.as_ref(), reserve_message(&stored, &record));
        Ok(stored)
    }

    /// Staff review of a pending hold.
    pub fn change_status(
        &self,
        id: &ReservationId,
        decision: ReservationDecision,
        actor: &Actor,
    ) -> Result<Reservation, ReservationError> {
        self.ensure_allowed(actor, Operation::ReviewReservation)?;

        let mut reservation = self
            .store
            .fetch(id)?
            .ok_or(ReservationError::NotFound)?;

        if reservation.status.is_decided() {
            return Err(ReservationError::AlreadyDecided {
                status: reservation.status,
            });
        }

        let status = match decision {
            ReservationDecision::Approved => ReservationStatus::Approved,
            ReservationDecision::Declined => ReservationStatus::Declined,
        };
        reservation.status = status;
        reservation.updated_at = Utc::now();
        reservation.audit.record(
            AuditAction::StatusChanged,
            changed_fields([("status", status.label().to_string())]),
            actor,
        );

        self.store.update(reservation.clone())?;

        let label = self.property_label(&reservation.property);
        fire_and_forget(
            self.notifier.as_ref(),
            decision_message(&reservation, decision, &label),
        );

        Ok(reservation)
    }

    /// Release the held property and remove the reservation row.
    pub fn cancel(&self, id: &ReservationId, actor: &Actor) -> Result<(), ReservationError> {
        self.ensure_allowed(actor, Operation::CancelReservation)?;

        let mut reservation = self
            .store
            .fetch(id)?
            .ok_or(ReservationError::NotFound)?;

        let expected = PropertyState::held(
            PropertyStatus::Reserved,
            HoldRef::Reservation(reservation.id.clone()),
        );
        self.registry
            .transition(&reservation.property, &expected, PropertyState::available())
            .map_err(|err| match err {
                RegistryError::Conflict { actual } => {
                    ReservationError::PropertyNotInReservedState { status: actual }
                }
                other => ReservationError::Registry(other),
            })?;

        reservation.audit.record(
            AuditAction::Cancelled,
            changed_fields([("status", "cancelled".to_string())]),
            actor,
        );
        self.store.delete(&reservation.id)?;

        fire_and_forget(self.notifier.as_ref(), cancel_message(&reservation));
        Ok(())
    }

    /// Read-only lookup of a hold by its client-facing code.
    pub fn validate(
        &self,
        reference: &PropertyRef,
        code: &str,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self
            .store
            .find_by_code(code)?
            .filter(|reservation| &reservation.property == reference)
            .ok_or(ReservationError::InvalidReservationCode)?;
        Ok(reservation)
    }

    fn ensure_allowed(&self, actor: &Actor, operation: Operation) -> Result<(), ReservationError> {
        if can_perform(actor.role, operation) {
            Ok(())
        } else {
            Err(ReservationError::PermissionDenied {
                role: actor.role,
                operation,
            })
        }
    }

    fn property_label(&self, reference: &PropertyRef) -> String {
        match self.registry.fetch(reference) {
            Ok(Some(record)) => record.label(),
            _ => format!("{} {}", reference.kind.label(), reference.id),
        }
    }
}

fn reserve_message(reservation: &Reservation, record: &PropertyRecord) -> NotificationMessage {
    let label = record.label();
    let (subject, body) = match reservation.status {
        ReservationStatus::Reserved => (
            format!("Reservation confirmed for {label}"),
            format!(
                "Dear {}, your reservation of {label} is confirmed. Your reservation code is {}.",
                reservation.client.name,
                reservation.code.as_str()
            ),
        ),
        _ => (
            format!("Reservation received for {label}"),
            format!(
                "Dear {}, your reservation request for {label} is under review. Your reservation code is {}.",
                reservation.client.name,
                reservation.code.as_str()
            ),
        ),
    };
    NotificationMessage::to_client(
        reservation.client.email.clone(),
        subject,
        body,
        NotificationCategory::Reservation,
    )
}

fn decision_message(
    reservation: &Reservation,
    decision: ReservationDecision,
    label: &str,
) -> NotificationMessage {
    let (subject, body) = match decision {
        ReservationDecision::Approved => (
            format!("Reservation approved for {label}"),
            format!(
                "Dear {}, your reservation of {label} has been approved. Our sales team will contact you with next steps.",
                reservation.client.name
            ),
        ),
        ReservationDecision::Declined => (
            format!("Reservation declined for {label}"),
            format!(
                "Dear {}, we are unable to proceed with your reservation of {label}. Please contact the sales office for details.",
                reservation.client.name
            ),
        ),
    };
    NotificationMessage::to_client(
        reservation.client.email.clone(),
        subject,
        body,
        NotificationCategory::Reservation,
    )
}

fn cancel_message(reservation: &Reservation) -> NotificationMessage {
    NotificationMessage::to_client(
        reservation.client.email.clone(),
        "Reservation cancelled",
        format!(
            "Dear {}, your reservation {} has been cancelled and the unit released.",
            reservation.client.name,
            reservation.code.as_str()
        ),
        NotificationCategory::Reservation,
    )
}

/// Error raised by the reservation service.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("property not found in registry")]
    PropertyNotFound,
    #[error("reservation not found")]
    NotFound,
    #[error("client already holds a reservation on this property")]
    DuplicateReservation,
    #[error("property is already reserved")]
    PropertyAlreadyReserved,
    #[error("property is not available (currently {})", status.label())]
    PropertyNotAvailable { status: PropertyStatus },
    #[error("reservation was already {}", status.label())]
    AlreadyDecided { status: ReservationStatus },
    #[error("property is not in a reserved state (currently {})", status.label())]
    PropertyNotInReservedState { status: PropertyStatus },
    #[error("reservation code does not match")]
    InvalidReservationCode,
    #[error("role {} may not perform {operation:?}", role.label())]
    PermissionDenied { role: ActorRole, operation: Operation },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReservationError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ReservationError::PropertyNotFound
            | ReservationError::NotFound
            | ReservationError::InvalidReservationCode => FailureKind::NotFound,
            ReservationError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            ReservationError::DuplicateReservation
            | ReservationError::PropertyAlreadyReserved
            | ReservationError::PropertyNotAvailable { .. }
            | ReservationError::AlreadyDecided { .. }
            | ReservationError::PropertyNotInReservedState { .. } => FailureKind::StateConflict,
            ReservationError::Registry(RegistryError::NotFound) => FailureKind::NotFound,
            ReservationError::Registry(RegistryError::Conflict { .. }) => {
                FailureKind::StateConflict
            }
            ReservationError::Store(StoreError::NotFound) => FailureKind::NotFound,
            ReservationError::Store(StoreError::Conflict) => FailureKind::StateConflict,
            ReservationError::Registry(RegistryError::Unavailable(_))
            | ReservationError::Store(StoreError::Unavailable(_)) => FailureKind::Internal,
        }
    }
}
