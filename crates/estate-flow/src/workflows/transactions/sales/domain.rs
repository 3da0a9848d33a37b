use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::transactions::audit::AuditTrail;
use crate::workflows::transactions::domain::{
    ClientSnapshot, LetterId, Money, PlanId, PropertyRef, ReservationId, SaleId,
};
use crate::workflows::transactions::letters::LetterStatus;

/// Approval axis of a sale. Approved and Declined are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Approved,
    Declined,
}

impl SaleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Approved => "approved",
            SaleStatus::Declined => "declined",
        }
    }
}

/// Aggregate payment position derived from paid versus payable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

/// How a recorded payment was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

/// Bucket a recorded payment is applied against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTarget {
    PropertyPrice,
    Facility,
    Water,
    Electricity,
    Supervision,
    Authority,
    Other,
    Infrastructure,
    Agency,
    Registration,
}

impl PaymentTarget {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentTarget::PropertyPrice => "property_price",
            PaymentTarget::Facility => "facility",
            PaymentTarget::Water => "water",
            PaymentTarget::Electricity => "electricity",
            PaymentTarget::Supervision => "supervision",
            PaymentTarget::Authority => "authority",
            PaymentTarget::Other => "other",
            PaymentTarget::Infrastructure => "infrastructure",
            PaymentTarget::Agency => "agency",
            PaymentTarget::Registration => "registration",
        }
    }
}

/// Amount/paid pair for one named fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLine {
    pub amount: Money,
    pub paid: Money,
}

impl FeeLine {
    pub fn charged(amount: Money) -> Self {
        Self { amount, paid: 0 }
    }

    pub fn outstanding(&self) -> Money {
        self.amount.saturating_sub(self.paid)
    }

    pub fn is_settled(&self) -> bool {
        self.paid >= self.amount
    }
}

/// Plain fee amounts as supplied on create or approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAmounts {
    #[serde(default)]
    pub facility: Money,
    #[serde(default)]
    pub water: Money,
    #[serde(default)]
    pub electricity: Money,
    #[serde(default)]
    pub supervision: Money,
    #[serde(default)]
    pub authority: Money,
    #[serde(default)]
    pub other: Money,
    #[serde(default)]
    pub infrastructure: Money,
    #[serde(default)]
    pub agency: Money,
}

impl FeeAmounts {
    pub fn total(&self) -> Money {
        self.facility
            + self.water
            + self.electricity
            + self.supervision
            + self.authority
            + self.other
            + self.infrastructure
            + self.agency
    }
}

/// Named fee set carried by every sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub facility: FeeLine,
    pub water: FeeLine,
    pub electricity: FeeLine,
    pub supervision: FeeLine,
    pub authority: FeeLine,
    pub other: FeeLine,
    pub infrastructure: FeeLine,
    pub agency: FeeLine,
}

impl FeeSchedule {
    pub fn from_amounts(amounts: &FeeAmounts) -> Self {
        Self {
            facility: FeeLine::charged(amounts.facility),
            water: FeeLine::charged(amounts.water),
            electricity: FeeLine::charged(amounts.electricity),
            supervision: FeeLine::charged(amounts.supervision),
            authority: FeeLine::charged(amounts.authority),
            other: FeeLine::charged(amounts.other),
            infrastructure: FeeLine::charged(amounts.infrastructure),
            agency: FeeLine::charged(amounts.agency),
        }
    }

    /// Replace the charged amounts, preserving anything already paid.
    pub fn reprice(&mut self, amounts: &FeeAmounts) {
        self.facility.amount = amounts.facility;
        self.water.amount = amounts.water;
        self.electricity.amount = amounts.electricity;
        self.supervision.amount = amounts.supervision;
        self.authority.amount = amounts.authority;
        self.other.amount = amounts.other;
        self.infrastructure.amount = amounts.infrastructure;
        self.agency.amount = amounts.agency;
    }

    pub fn total(&self) -> Money {
        self.facility.amount
            + self.water.amount
            + self.electricity.amount
            + self.supervision.amount
            + self.authority.amount
            + self.other.amount
            + self.infrastructure.amount
            + self.agency.amount
    }

    /// Fee line for a payment target; `None` for the non-fee targets.
    pub fn line_mut(&mut self, target: PaymentTarget) -> Option<&mut FeeLine> {
        match target {
            PaymentTarget::Facility => Some(&mut self.facility),
            PaymentTarget::Water => Some(&mut self.water),
            PaymentTarget::Electricity => Some(&mut self.electricity),
            PaymentTarget::Supervision => Some(&mut self.supervision),
            PaymentTarget::Authority => Some(&mut self.authority),
            PaymentTarget::Other => Some(&mut self.other),
            PaymentTarget::Infrastructure => Some(&mut self.infrastructure),
            PaymentTarget::Agency => Some(&mut self.agency),
            PaymentTarget::PropertyPrice | PaymentTarget::Registration => None,
        }
    }
}

/// Mirrored child-letter link stored on the sale. The status here must
/// always equal the letter's own status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterLink {
    pub id: LetterId,
    pub status: LetterStatus,
}

/// The priced, fee-bearing transaction record for a property and a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub property: PropertyRef,
    pub client: ClientSnapshot,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
    pub property_price: Money,
    pub fees: FeeSchedule,
    pub discount: Money,
    /// Registration is billed beside the payable sum and settles on its own.
    pub registration: FeeLine,
    pub paid_amount: Money,
    pub total_payable: Money,
    pub status: SaleStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub offer: Option<LetterLink>,
    #[serde(default)]
    pub allocation: Option<LetterLink>,
    #[serde(default)]
    pub payment_plan_id: Option<PlanId>,
    pub audit: AuditTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Recompute `total_payable` and the derived payment status. Callers
    /// must have validated that the discount does not exceed price + fees.
    pub fn recompute_totals(&mut self) {
        self.total_payable = (self.property_price + self.fees.total()) - self.discount;
        self.payment_status = derive_payment_status(self.paid_amount, self.total_payable);
    }

    pub fn outstanding(&self) -> Money {
        self.total_payable.saturating_sub(self.paid_amount)
    }
}

pub(crate) fn derive_payment_status(paid: Money, payable: Money) -> PaymentStatus {
    if paid == 0 && payable > 0 {
        PaymentStatus::Unpaid
    } else if paid >= payable {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    }
}
