use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::domain::{PaymentPlan, PlanFrequency, PlanStatus};
use crate::workflows::transactions::audit::{changed_fields, AuditAction, AuditTrail};
use crate::workflows::transactions::domain::{Actor, ActorRole, Money, PlanId, SaleId};
use crate::workflows::transactions::notify::{
    fire_and_forget, NotificationCategory, NotificationMessage, NotificationPublisher,
};
use crate::workflows::transactions::policy::{can_perform, Operation};
use crate::workflows::transactions::router::FailureKind;
use crate::workflows::transactions::sales::{Sale, SaleStatus};
use crate::workflows::transactions::store::{PlanStore, SaleStore, StoreError};

/// Inbound payload for a new installment schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanRequest {
    pub sale_id: SaleId,
    pub frequency: PlanFrequency,
    pub amount_per_cycle: Money,
    pub total_cycles: u32,
    #[serde(default)]
    pub total_amount: Option<Money>,
    pub start_date: NaiveDate,
    /// First due date for `Custom` plans; required for that cadence.
    #[serde(default)]
    pub custom_date: Option<NaiveDate>,
}

static PLAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_plan_id() -> PlanId {
    let id = PLAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PlanId(format!("plan-{id:06}"))
}

/// Attaches installment schedules to approved sales and tracks cycle
/// completion against the sale's outstanding balance.
pub struct PlanService<P, S, N> {
    plans: Arc<P>,
    sales: Arc<S>,
    notifier: Arc<N>,
}

impl<P, S, N> PlanService<P, S, N>
where
    P: PlanStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(plans: Arc<P>, sales: Arc<S>, notifier: Arc<N>) -> Self {
        Self {
            plans,
            sales,
            notifier,
        }
    }

    pub fn create(
        &self,
        request: CreatePlanRequest,
        actor: &Actor,
    ) -> Result<PaymentPlan, PlanError> {
        self.ensure_allowed(actor, Operation::CreatePaymentPlan)?;

        if request.total_cycles == 0 || request.amount_per_cycle == 0 {
            return Err(PlanError::InvalidSchedule);
        }

        let mut sale = self
            .sales
            .fetch(&request.sale_id)?
            .ok_or(PlanError::SaleNotAvailable)?;
        if sale.status != SaleStatus::Approved {
            return Err(PlanError::SaleNotApproved {
                status: sale.status,
            });
        }
        if sale.payment_plan_id.is_some() {
            return Err(PlanError::PlanAlreadyExists);
        }

        let total_amount = request
            .total_amount
            .unwrap_or(request.amount_per_cycle * request.total_cycles as Money);
        if total_amount > sale.outstanding() {
            return Err(PlanError::ExceedsOutstanding {
                outstanding: sale.outstanding(),
            });
        }

        let next_payment_date = match request.frequency {
            PlanFrequency::Custom => request.custom_date.ok_or(PlanError::MissingCustomDate)?,
            frequency => frequency
                .advance(request.start_date)
                .ok_or(PlanError::InvalidSchedule)?,
        };

        let now = Utc::now();
        let mut plan = PaymentPlan {
            id: next_plan_id(),
            sale_id: request.sale_id.clone(),
            frequency: request.frequency,
            amount_per_cycle: request.amount_per_cycle,
            total_cycles: request.total_cycles,
            cycles_completed: 0,
            total_amount,
            next_payment_date,
            status: PlanStatus::Active,
            audit: AuditTrail::default(),
            created_at: now,
            updated_at: now,
        };
        plan.audit.record(
            AuditAction::Created,
            changed_fields([
                ("status", PlanStatus::Active.label().to_string()),
                ("total_amount", total_amount.to_string()),
            ]),
            actor,
        );

        let stored = self.plans.insert(plan)?;

        sale.payment_plan_id = Some(stored.id.clone());
        sale.updated_at = Utc::now();
        sale.audit.record(
            AuditAction::Updated,
            changed_fields([("payment_plan_id", stored.id.0.clone())]),
            actor,
        );
        if let Err(err) = self.sales.update(sale.clone()) {
            let _ = self.plans.delete(&stored.id);
            return Err(PlanError::Store(err));
        }

        fire_and_forget(self.notifier.as_ref(), schedule_message(&sale, &stored));
        Ok(stored)
    }

    /// Record one completed cycle. Completion flips exactly at the
    /// boundary; a completed or cancelled plan rejects further cycles.
    pub fn record_cycle(
        &self,
        id: &PlanId,
        next_custom_date: Option<NaiveDate>,
        actor: &Actor,
    ) -> Result<PaymentPlan, PlanError> {
        self.ensure_allowed(actor, Operation::RecordPlanCycle)?;

        let mut plan = self.plans.fetch(id)?.ok_or(PlanError::NotFound)?;
        if plan.status != PlanStatus::Active {
            return Err(PlanError::PlanNotActive {
                status: plan.status,
            });
        }

        plan.cycles_completed += 1;
        if plan.cycles_completed == plan.total_cycles {
            plan.status = PlanStatus::Completed;
        } else {
            plan.next_payment_date = match plan.frequency {
                PlanFrequency::Custom => {
                    next_custom_date.ok_or(PlanError::MissingCustomDate)?
                }
                frequency => frequency
                    .advance(plan.next_payment_date)
                    .ok_or(PlanError::InvalidSchedule)?,
            };
        }
        plan.updated_at = Utc::now();
        plan.audit.record(
            AuditAction::CycleRecorded,
            changed_fields([
                ("cycles_completed", plan.cycles_completed.to_string()),
                ("status", plan.status.label().to_string()),
            ]),
            actor,
        );
        self.plans.update(plan.clone())?;

        if plan.status == PlanStatus::Completed {
            if let Ok(Some(sale)) = self.sales.fetch(&plan.sale_id) {
                fire_and_forget(self.notifier.as_ref(), completion_message(&sale, &plan));
            }
        }
        Ok(plan)
    }

    /// Staff cancellation; billing does not resume.
    pub fn cancel(&self, id: &PlanId, remark: &str, actor: &Actor) -> Result<PaymentPlan, PlanError> {
        self.ensure_allowed(actor, Operation::CancelPaymentPlan)?;

        let mut plan = self.plans.fetch(id)?.ok_or(PlanError::NotFound)?;
        if plan.status != PlanStatus::Active {
            return Err(PlanError::PlanNotActive {
                status: plan.status,
            });
        }

        plan.status = PlanStatus::Cancelled;
        plan.updated_at = Utc::now();
        plan.audit.record(
            AuditAction::Cancelled,
            changed_fields([
                ("status", PlanStatus::Cancelled.label().to_string()),
                ("remark", remark.to_string()),
            ]),
            actor,
        );
        self.plans.update(plan.clone())?;
        Ok(plan)
    }

    fn ensure_allowed(&self, actor: &Actor, operation: Operation) -> Result<(), PlanError> {
        if can_perform(actor.role, operation) {
            Ok(())
        } else {
            Err(PlanError::PermissionDenied {
                role: actor.role,
                operation,
            })
        }
    }
}

fn schedule_message(sale: &Sale, plan: &PaymentPlan) -> NotificationMessage {
    NotificationMessage::to_client(
        sale.client.email.clone(),
        "Payment plan confirmed",
        format!(
            "Dear {}, your payment plan for {} is active: {} cycles of {}, next payment due {}.",
            sale.client.name,
            sale.id.0,
            plan.total_cycles,
            plan.amount_per_cycle,
            plan.next_payment_date
        ),
        NotificationCategory::PaymentPlan,
    )
}

fn completion_message(sale: &Sale, plan: &PaymentPlan) -> NotificationMessage {
    NotificationMessage::to_client(
        sale.client.email.clone(),
        "Payment plan completed",
        format!(
            "Dear {}, your payment plan for {} is complete after {} cycles.",
            sale.client.name, sale.id.0, plan.total_cycles
        ),
        NotificationCategory::PaymentPlan,
    )
}

/// Error raised by the payment plan scheduler.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("sale not available")]
    SaleNotAvailable,
    #[error("payment plan not found")]
    NotFound,
    #[error("sale is not approved (currently {})", status.label())]
    SaleNotApproved { status: SaleStatus },
    #[error("sale already carries a payment plan")]
    PlanAlreadyExists,
    #[error("cycle count and amount must be positive")]
    InvalidSchedule,
    #[error("custom cadence requires an explicit next date")]
    MissingCustomDate,
    #[error("plan total exceeds the sale's outstanding balance ({outstanding})")]
    ExceedsOutstanding { outstanding: Money },
    #[error("plan is not active (currently {})", status.label())]
    PlanNotActive { status: PlanStatus },
    #[error("role {} may not perform {operation:?}", role.label())]
    PermissionDenied { role: ActorRole, operation: Operation },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PlanError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PlanError::SaleNotAvailable | PlanError::NotFound => FailureKind::NotFound,
            PlanError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            PlanError::InvalidSchedule
            | PlanError::MissingCustomDate
            | PlanError::ExceedsOutstanding { .. } => FailureKind::Validation,
            PlanError::SaleNotApproved { .. }
            | PlanError::PlanAlreadyExists
            | PlanError::PlanNotActive { .. } => FailureKind::StateConflict,
            PlanError::Store(StoreError::NotFound) => FailureKind::NotFound,
            PlanError::Store(StoreError::Conflict) => FailureKind::StateConflict,
            PlanError::Store(StoreError::Unavailable(_)) => FailureKind::Internal,
        }
    }
}
