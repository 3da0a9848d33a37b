use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::workflows::transactions::audit::AuditTrail;
use crate::workflows::transactions::domain::{ClientSnapshot, PropertyRef, ReservationId};

/// Reservation lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Reserved,
    Approved,
    Declined,
}

impl ReservationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Declined => "declined",
        }
    }

    /// Terminal on the review axis: no further staff decision applies.
    pub const fn is_decided(self) -> bool {
        matches!(self, ReservationStatus::Approved | ReservationStatus::Declined)
    }
}

/// Decision staff can take on a reservation under review. Anything else
/// arriving over the wire is rejected before it reaches the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationDecision {
    Approved,
    Declined,
}

/// Human-facing lookup code handed to the client at reservation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationCode(pub String);

impl ReservationCode {
    /// Six random digits, no leading zero.
    pub(crate) fn generate() -> Self {
        let digits = rand::thread_rng().gen_range(100_000..=999_999u32);
        Self(digits.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Temporary hold on a property for one prospective client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub property: PropertyRef,
    pub client: ClientSnapshot,
    pub code: ReservationCode,
    pub status: ReservationStatus,
    pub audit: AuditTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
