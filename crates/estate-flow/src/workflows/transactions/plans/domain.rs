use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::transactions::audit::AuditTrail;
use crate::workflows::transactions::domain::{Money, PlanId, SaleId};

/// Cycle cadence for an installment schedule. `Custom` advances to an
/// explicitly supplied date instead of a computed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFrequency {
    Monthly,
    Weekly,
    Quarterly,
    Yearly,
    Custom,
}

impl PlanFrequency {
    /// Next due date one cycle after `from`, or `None` for `Custom`.
    pub fn advance(self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            PlanFrequency::Monthly => from.checked_add_months(Months::new(1)),
            PlanFrequency::Weekly => from.checked_add_signed(Duration::weeks(1)),
            PlanFrequency::Quarterly => from.checked_add_months(Months::new(3)),
            PlanFrequency::Yearly => from.checked_add_months(Months::new(12)),
            PlanFrequency::Custom => None,
        }
    }
}

/// Installment schedule lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

/// Installment schedule attached to a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub id: PlanId,
    pub sale_id: SaleId,
    pub frequency: PlanFrequency,
    pub amount_per_cycle: Money,
    pub total_cycles: u32,
    pub cycles_completed: u32,
    pub total_amount: Money,
    pub next_payment_date: NaiveDate,
    pub status: PlanStatus,
    pub audit: AuditTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentPlan {
    pub fn remaining_cycles(&self) -> u32 {
        self.total_cycles - self.cycles_completed
    }
}
