use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::workflows::transactions::audit::AuditTrail;
use crate::workflows::transactions::domain::{LetterId, PropertyRef, SaleId};

/// Discriminates the two letter families the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterKind {
    Offer,
    Allocation,
}

impl LetterKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            LetterKind::Offer => "OF",
            LetterKind::Allocation => "AL",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LetterKind::Offer => "offer",
            LetterKind::Allocation => "allocation",
        }
    }

    /// Wire label of the issued state: OFFERED for offers, ALLOCATED for
    /// allocation letters.
    pub const fn issued_label(self) -> &'static str {
        match self {
            LetterKind::Offer => "offered",
            LetterKind::Allocation => "allocated",
        }
    }
}

/// Letter lifecycle. `Issued` reads as OFFERED or ALLOCATED per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterStatus {
    Issued,
    Canceled,
}

/// Staff decision on an existing letter. Approving re-issues; anything else
/// arriving over the wire is rejected before it reaches the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterDecision {
    Approved,
    Canceled,
}

/// Offer or allocation letter bound 1:1 to a sale. The property reference
/// is denormalized from the sale at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    pub id: LetterId,
    pub kind: LetterKind,
    pub sale_id: SaleId,
    pub property: PropertyRef,
    pub number: String,
    pub file_url: String,
    pub status: LetterStatus,
    pub audit: AuditTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Letter number: kind prefix plus six random digits.
pub(crate) fn generate_number(kind: LetterKind) -> String {
    let digits = rand::thread_rng().gen_range(100_000..=999_999u32);
    format!("{}{digits}", kind.prefix())
}
