use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::domain::{
    derive_payment_status, FeeAmounts, FeeLine, FeeSchedule, PaymentMethod, PaymentStatus,
    PaymentTarget, Sale, SaleStatus,
};
use crate::workflows::transactions::audit::{changed_fields, AuditAction, AuditTrail};
use crate::workflows::transactions::domain::{
    Actor, ActorRole, ClientSnapshot, HoldRef, Money, PropertyRef, PropertyStatus, SaleId,
};
use crate::workflows::transactions::notify::{
    fire_and_forget, NotificationCategory, NotificationMessage, NotificationPublisher,
};
use crate::workflows::transactions::policy::{can_perform, Operation};
use crate::workflows::transactions::registry::{PropertyRegistry, PropertyState, RegistryError};
use crate::workflows::transactions::reservations::ReservationStatus;
use crate::workflows::transactions::router::FailureKind;
use crate::workflows::transactions::store::{ReservationStore, SaleStore, StoreError};

/// Inbound payload for a sale application.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleRequest {
    pub property: PropertyRef,
    pub client: ClientSnapshot,
    #[serde(default)]
    pub company_name: Option<String>,
    pub property_price: Money,
    #[serde(default)]
    pub fees: FeeAmounts,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub registration_fee: Money,
    #[serde(default)]
    pub reservation_code: Option<String>,
}

/// Price overrides applied at approval time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalTerms {
    #[serde(default)]
    pub property_price: Option<Money>,
    #[serde(default)]
    pub fees: Option<FeeAmounts>,
    #[serde(default)]
    pub discount: Option<Money>,
    /// Opening receipt recorded together with the approval.
    #[serde(default)]
    pub opening_payment: Option<Money>,
}

/// One recorded payment against a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: String,
    pub target: PaymentTarget,
}

static SALE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_sale_id() -> SaleId {
    let id = SALE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SaleId(format!("sale-{id:06}"))
}

/// The central state machine: turns a reservation (or a direct application)
/// into a priced sale, approves or declines it, and keeps the payment
/// bookkeeping honest.
pub struct SaleService<S, RS, R, N> {
    sales: Arc<S>,
    reservations: Arc<RS>,
    registry: Arc<R>,
    notifier: Arc<N>,
}

impl<S, RS, R, N> SaleService<S, RS, R, N>
where
    S: SaleStore + 'static,
    RS: ReservationStore + 'static,
    R: PropertyRegistry + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(sales: Arc<S>, reservations: Arc<RS>, registry: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            sales,
            reservations,
            registry,
            notifier,
        }
    }

    /// Open a sale application.
    ///
    /// With a reservation code the registry hold is re-pointed from the
    /// reservation to the new sale; without one the sale claims the unit
    /// itself (Available -> Reserved, pending purchase). Either way the
    /// property ends Reserved with the sale as holder.
    pub fn create(&self, request: CreateSaleRequest, actor: &Actor) -> Result<Sale, SaleError> {
        self.ensure_allowed(actor, Operation::CreateSale)?;

        if request.property_price == 0 {
            return Err(SaleError::MissingPrice);
        }
        if request.discount > request.property_price + request.fees.total() {
            return Err(SaleError::InvalidDiscount);
        }

        let record = self
            .registry
            .fetch(&request.property)?
            .ok_or(SaleError::PropertyNotFound)?;

        let reservation = match &request.reservation_code {
            Some(code) => {
                let reservation = self
                    .reservations
                    .find_by_code(code)?
                    .ok_or(SaleError::InvalidReservationCode)?;
                if reservation.property != request.property {
                    return Err(SaleError::ReservationPropertyMismatch);
                }
                if !matches!(
                    reservation.status,
                    ReservationStatus::Approved | ReservationStatus::Reserved
                ) {
                    return Err(SaleError::ReservationNotConfirmed {
                        status: reservation.status,
                    });
                }
                Some(reservation)
            }
            None => {
                if record.status != PropertyStatus::Available {
                    return Err(SaleError::PropertyNotAvailable {
                        status: record.status,
                    });
                }
                None
            }
        };

        let now = Utc::now();
        let mut sale = Sale {
            id: next_sale_id(),
            property: request.property.clone(),
            client: request.client,
            company_name: request.company_name,
            reservation_id: reservation.as_ref().map(|r| r.id.clone()),
            property_price: request.property_price,
            fees: FeeSchedule::from_amounts(&request.fees),
            discount: request.discount,
            registration: FeeLine::charged(request.registration_fee),
            paid_amount: 0,
            total_payable: 0,
            status: SaleStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            offer: None,
            allocation: None,
            payment_plan_id: None,
            audit: AuditTrail::default(),
            created_at: now,
            updated_at: now,
        };
        sale.recompute_totals();
        sale.audit.record(
            AuditAction::Created,
            changed_fields([
                ("status", SaleStatus::Pending.label().to_string()),
                ("total_payable", sale.total_payable.to_string()),
            ]),
            actor,
        );

        let stored = self.sales.insert_active(sale).map_err(|err| match err {
            StoreError::Conflict => SaleError::PropertyAlreadyUnderSale,
            other => SaleError::Store(other),
        })?;

        let expected = match &reservation {
            Some(reservation) => PropertyState::held(
                PropertyStatus::Reserved,
                HoldRef::Reservation(reservation.id.clone()),
            ),
            None => PropertyState::available(),
        };
        let next = PropertyState::held(PropertyStatus::Reserved, HoldRef::Sale(stored.id.clone()));
        if let Err(err) = self.registry.transition(&request.property, &expected, next) {
            let _ = self.sales.delete(&stored.id);
            return Err(match err {
                RegistryError::Conflict { actual } => {
                    SaleError::PropertyNotAvailable { status: actual }
                }
                other => SaleError::Registry(other),
            });
        }

        fire_and_forget(
            self.notifier.as_ref(),
            application_message(&stored, &record.label()),
        );
        Ok(stored)
    }

    /// Staff approval: applies any price overrides, records an optional
    /// opening payment, and marks the property sold.
    pub fn approve(
        &self,
        id: &SaleId,
        terms: ApprovalTerms,
        actor: &Actor,
    ) -> Result<Sale, SaleError> {
        self.ensure_allowed(actor, Operation::ApproveSale)?;

        let mut sale = self.sales.fetch(id)?.ok_or(SaleError::SaleNotAvailable)?;
        if sale.status != SaleStatus::Pending {
            return Err(SaleError::AlreadyDecided {
                status: sale.status,
            });
        }

        if let Some(price) = terms.property_price {
            if price == 0 {
                return Err(SaleError::MissingPrice);
            }
            sale.property_price = price;
        }
        if let Some(fees) = &terms.fees {
            sale.fees.reprice(fees);
        }
        if let Some(discount) = terms.discount {
            sale.discount = discount;
        }
        if sale.discount > sale.property_price + sale.fees.total() {
            return Err(SaleError::InvalidDiscount);
        }
        sale.recompute_totals();

        if let Some(opening) = terms.opening_payment {
            if sale.paid_amount + opening > sale.total_payable {
                return Err(SaleError::PaymentExceedsPayable {
                    outstanding: sale.outstanding(),
                });
            }
            sale.paid_amount += opening;
        }

        let expected =
            PropertyState::held(PropertyStatus::Reserved, HoldRef::Sale(sale.id.clone()));
        let next = PropertyState::held(PropertyStatus::Sold, HoldRef::Sale(sale.id.clone()));
        self.registry
            .transition(&sale.property, &expected, next)
            .map_err(|err| match err {
                RegistryError::Conflict { actual } => {
                    SaleError::PropertyStateConflict { status: actual }
                }
                other => SaleError::Registry(other),
            })?;

        sale.status = SaleStatus::Approved;
        sale.payment_status = derive_payment_status(sale.paid_amount, sale.total_payable);
        sale.updated_at = Utc::now();
        sale.audit.record(
            AuditAction::StatusChanged,
            changed_fields([
                ("status", SaleStatus::Approved.label().to_string()),
                ("total_payable", sale.total_payable.to_string()),
                ("paid_amount", sale.paid_amount.to_string()),
            ]),
            actor,
        );

        if let Err(err) = self.sales.update(sale.clone()) {
            // Best-effort rollback of the registry flip before surfacing.
            let expected =
                PropertyState::held(PropertyStatus::Sold, HoldRef::Sale(sale.id.clone()));
            let revert =
                PropertyState::held(PropertyStatus::Reserved, HoldRef::Sale(sale.id.clone()));
            let _ = self.registry.transition(&sale.property, &expected, revert);
            return Err(SaleError::Store(err));
        }

        fire_and_forget(self.notifier.as_ref(), approval_message(&sale));
        Ok(sale)
    }

    /// Staff decline: terminal, releases the unit back to the market.
    pub fn decline(&self, id: &SaleId, remark: &str, actor: &Actor) -> Result<Sale, SaleError> {
        self.ensure_allowed(actor, Operation::DeclineSale)?;

        let mut sale = self.sales.fetch(id)?.ok_or(SaleError::SaleNotAvailable)?;
        if sale.status != SaleStatus::Pending {
            return Err(SaleError::AlreadyDecided {
                status: sale.status,
            });
        }

        let expected =
            PropertyState::held(PropertyStatus::Reserved, HoldRef::Sale(sale.id.clone()));
        self.registry
            .transition(&sale.property, &expected, PropertyState::available())
            .map_err(|err| match err {
                RegistryError::Conflict { actual } => {
                    SaleError::PropertyStateConflict { status: actual }
                }
                other => SaleError::Registry(other),
            })?;

        sale.status = SaleStatus::Declined;
        sale.updated_at = Utc::now();
        sale.audit.record(
            AuditAction::StatusChanged,
            changed_fields([
                ("status", SaleStatus::Declined.label().to_string()),
                ("remark", remark.to_string()),
            ]),
            actor,
        );
        self.sales.update(sale.clone())?;

        fire_and_forget(self.notifier.as_ref(), decline_message(&sale));
        Ok(sale)
    }

    /// Record a payment against an approved sale, applied to the bucket
    /// named by the target. Registration settles beside the payable sum.
    pub fn record_payment(
        &self,
        id: &SaleId,
        payment: PaymentInput,
        actor: &Actor,
    ) -> Result<Sale, SaleError> {
        self.ensure_allowed(actor, Operation::RecordSalePayment)?;

        let mut sale = self.sales.fetch(id)?.ok_or(SaleError::SaleNotAvailable)?;
        if sale.status != SaleStatus::Approved {
            return Err(SaleError::SaleNotApproved {
                status: sale.status,
            });
        }
        if payment.amount == 0 {
            return Err(SaleError::InvalidPaymentAmount);
        }

        match payment.target {
            PaymentTarget::Registration => {
                if sale.registration.paid + payment.amount > sale.registration.amount {
                    return Err(SaleError::PaymentExceedsBucket {
                        target: payment.target,
                        outstanding: sale.registration.outstanding(),
                    });
                }
                sale.registration.paid += payment.amount;
            }
            PaymentTarget::PropertyPrice => {
                if sale.paid_amount + payment.amount > sale.total_payable {
                    return Err(SaleError::PaymentExceedsPayable {
                        outstanding: sale.outstanding(),
                    });
                }
                sale.paid_amount += payment.amount;
            }
            target => {
                if sale.paid_amount + payment.amount > sale.total_payable {
                    return Err(SaleError::PaymentExceedsPayable {
                        outstanding: sale.outstanding(),
                    });
                }
                let line = sale
                    .fees
                    .line_mut(target)
                    .expect("fee targets always map to a line");
                if line.paid + payment.amount > line.amount {
                    return Err(SaleError::PaymentExceedsBucket {
                        target,
                        outstanding: line.outstanding(),
                    });
                }
                line.paid += payment.amount;
                sale.paid_amount += payment.amount;
            }
        }

        sale.payment_status = derive_payment_status(sale.paid_amount, sale.total_payable);
        sale.updated_at = Utc::now();
        sale.audit.record(
            AuditAction::PaymentRecorded,
            changed_fields([
                ("amount", payment.amount.to_string()),
                ("target", payment.target.label().to_string()),
                ("reference", payment.reference.clone()),
                ("paid_amount", sale.paid_amount.to_string()),
            ]),
            actor,
        );
        self.sales.update(sale.clone())?;

        fire_and_forget(
            self.notifier.as_ref(),
            receipt_message(&sale, payment.amount),
        );
        Ok(sale)
    }

    fn ensure_allowed(&self, actor: &Actor, operation: Operation) -> Result<(), SaleError> {
        if can_perform(actor.role, operation) {
            Ok(())
        } else {
            Err(SaleError::PermissionDenied {
                role: actor.role,
                operation,
            })
        }
    }
}

fn application_message(sale: &Sale, label: &str) -> NotificationMessage {
    NotificationMessage::to_client(
        sale.client.email.clone(),
        format!("Sale application received for {label}"),
        format!(
            "Dear {}, your application for {label} has been received and is awaiting approval. Total payable: {}.",
            sale.client.name, sale.total_payable
        ),
        NotificationCategory::Sale,
    )
}

fn approval_message(sale: &Sale) -> NotificationMessage {
    NotificationMessage::to_client(
        sale.client.email.clone(),
        "Sale approved",
        format!(
            "Dear {}, your purchase {} has been approved. Outstanding balance: {}.",
            sale.client.name,
            sale.id.0,
            sale.outstanding()
        ),
        NotificationCategory::Sale,
    )
}

fn decline_message(sale: &Sale) -> NotificationMessage {
    NotificationMessage::to_client(
        sale.client.email.clone(),
        "Sale application declined",
        format!(
            "Dear {}, your application {} was declined. Please contact the sales office for details.",
            sale.client.name, sale.id.0
        ),
        NotificationCategory::Sale,
    )
}

fn receipt_message(sale: &Sale, amount: Money) -> NotificationMessage {
    NotificationMessage::to_client(
        sale.client.email.clone(),
        "Payment received",
        format!(
            "Dear {}, we received your payment of {} against {}. Outstanding balance: {}.",
            sale.client.name,
            amount,
            sale.id.0,
            sale.outstanding()
        ),
        NotificationCategory::Sale,
    )
}

/// Error raised by the sale workflow.
#[derive(Debug, thiserror::Error)]
pub enum SaleError {
    #[error("property not found in registry")]
    PropertyNotFound,
    #[error("sale not available")]
    SaleNotAvailable,
    #[error("property price is required")]
    MissingPrice,
    #[error("discount exceeds price plus fees")]
    InvalidDiscount,
    #[error("reservation code does not match")]
    InvalidReservationCode,
    #[error("reservation is bound to a different property")]
    ReservationPropertyMismatch,
    #[error("reservation is not confirmed (currently {})", status.label())]
    ReservationNotConfirmed { status: ReservationStatus },
    #[error("property is not available (currently {})", status.label())]
    PropertyNotAvailable { status: PropertyStatus },
    #[error("property is already under an active sale")]
    PropertyAlreadyUnderSale,
    #[error("property state conflicts with this transition (currently {})", status.label())]
    PropertyStateConflict { status: PropertyStatus },
    #[error("sale was already {}", status.label())]
    AlreadyDecided { status: SaleStatus },
    #[error("sale is not approved (currently {})", status.label())]
    SaleNotApproved { status: SaleStatus },
    #[error("payment amount must be positive")]
    InvalidPaymentAmount,
    #[error("payment exceeds the payable balance (outstanding {outstanding})")]
    PaymentExceedsPayable { outstanding: Money },
    #[error("payment exceeds the {} bucket (outstanding {outstanding})", target.label())]
    PaymentExceedsBucket {
        target: PaymentTarget,
        outstanding: Money,
    },
    #[error("role {} may not perform {operation:?}", role.label())]
    PermissionDenied { role: ActorRole, operation: Operation },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SaleError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SaleError::PropertyNotFound | SaleError::SaleNotAvailable => FailureKind::NotFound,
            SaleError::InvalidReservationCode => FailureKind::NotFound,
            SaleError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            SaleError::MissingPrice
            | SaleError::InvalidDiscount
            | SaleError::InvalidPaymentAmount
            | SaleError::PaymentExceedsPayable { .. }
            | SaleError::PaymentExceedsBucket { .. } => FailureKind::Validation,
            SaleError::ReservationPropertyMismatch
            | SaleError::ReservationNotConfirmed { .. }
            | SaleError::PropertyNotAvailable { .. }
            | SaleError::PropertyAlreadyUnderSale
            | SaleError::PropertyStateConflict { .. }
            | SaleError::AlreadyDecided { .. }
            | SaleError::SaleNotApproved { .. } => FailureKind::StateConflict,
            SaleError::Registry(RegistryError::NotFound) => FailureKind::NotFound,
            SaleError::Registry(RegistryError::Conflict { .. }) => FailureKind::StateConflict,
            SaleError::Store(StoreError::NotFound) => FailureKind::NotFound,
            SaleError::Store(StoreError::Conflict) => FailureKind::StateConflict,
            SaleError::Registry(RegistryError::Unavailable(_))
            | SaleError::Store(StoreError::Unavailable(_)) => FailureKind::Internal,
        }
    }
}
