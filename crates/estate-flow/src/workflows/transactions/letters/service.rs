use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::domain::{generate_number, Letter, LetterDecision, LetterKind, LetterStatus};
use crate::workflows::transactions::audit::{changed_fields, AuditAction, AuditTrail};
use crate::workflows::transactions::domain::{Actor, ActorRole, LetterId, SaleId};
use crate::workflows::transactions::notify::{
    fire_and_forget, NotificationCategory, NotificationMessage, NotificationPublisher,
};
use crate::workflows::transactions::policy::{can_perform, Operation};
use crate::workflows::transactions::router::FailureKind;
use crate::workflows::transactions::sales::{LetterLink, Sale, SaleStatus};
use crate::workflows::transactions::store::{LetterStore, SaleStore, StoreError};

static LETTER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_letter_id() -> LetterId {
    let id = LETTER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LetterId(format!("ltr-{id:06}"))
}

/// Issues and maintains offer/allocation letters for approved sales,
/// keeping the sale's mirror link in lockstep with the letter itself.
pub struct LetterService<L, S, N> {
    letters: Arc<L>,
    sales: Arc<S>,
    notifier: Arc<N>,
}

impl<L, S, N> LetterService<L, S, N>
where
    L: LetterStore + 'static,
    S: SaleStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(letters: Arc<L>, sales: Arc<S>, notifier: Arc<N>) -> Self {
        Self {
            letters,
            sales,
            notifier,
        }
    }

    /// Issue a letter for a sale, or refresh the file of the one that
    /// already exists. A sale never accumulates a second letter of the same
    /// kind; the store's `(sale, kind)` uniqueness backs that up under
    /// concurrent first issuance.
    pub fn issue(
        &self,
        kind: LetterKind,
        sale_id: &SaleId,
        file_url: String,
        actor: &Actor,
    ) -> Result<Letter, LetterError> {
        self.ensure_allowed(actor, issue_operation(kind))?;

        let mut sale = self
            .sales
            .fetch(sale_id)?
            .ok_or(LetterError::SaleNotAvailable)?;
        match sale.status {
            SaleStatus::Approved => {}
            SaleStatus::Pending => return Err(LetterError::PendingSale { kind }),
            SaleStatus::Declined => return Err(LetterError::DeclinedSale { kind }),
        }

        if let Some(existing) = self.letters.find_by_sale(sale_id, kind)? {
            return self.refresh(existing, file_url, actor);
        }

        let now = Utc::now();
        let requested_url = file_url.clone();
        let mut letter = Letter {
            id: next_letter_id(),
            kind,
            sale_id: sale_id.clone(),
            property: sale.property.clone(),
            number: generate_number(kind),
            file_url,
            status: LetterStatus::Issued,
            audit: AuditTrail::default(),
            created_at: now,
            updated_at: now,
        };
        letter.audit.record(
            AuditAction::Created,
            changed_fields([
                ("number", letter.number.clone()),
                ("status", kind.issued_label().to_string()),
            ]),
            actor,
        );

        let stored = match self.letters.insert(letter) {
            Ok(stored) => stored,
            // Lost a first-issuance race; fall through to the update path.
            Err(StoreError::Conflict) => {
                let existing = self
                    .letters
                    .find_by_sale(sale_id, kind)?
                    .ok_or(LetterError::Store(StoreError::Conflict))?;
                return self.refresh(existing, requested_url, actor);
            }
            Err(other) => return Err(LetterError::Store(other)),
        };

        let link = LetterLink {
            id: stored.id.clone(),
            status: LetterStatus::Issued,
        };
        set_link(&mut sale, kind, Some(link));
        sale.updated_at = Utc::now();
        sale.audit.record(
            AuditAction::Updated,
            changed_fields([
                (link_field(kind), stored.id.0.clone()),
                (status_field(kind), kind.issued_label().to_string()),
            ]),
            actor,
        );
        if let Err(err) = self.sales.update(sale.clone()) {
            let _ = self.letters.delete(&stored.id);
            return Err(LetterError::Store(err));
        }

        fire_and_forget(
            self.notifier.as_ref(),
            issued_message(&sale, &stored, kind),
        );
        Ok(stored)
    }

    fn refresh(
        &self,
        mut letter: Letter,
        file_url: String,
        actor: &Actor,
    ) -> Result<Letter, LetterError> {
        letter.file_url = file_url;
        letter.updated_at = Utc::now();
        letter.audit.record(
            AuditAction::Updated,
            changed_fields([("file_url", letter.file_url.clone())]),
            actor,
        );
        self.letters.update(letter.clone())?;
        Ok(letter)
    }

    /// Staff decision on a letter: Approved re-issues, Canceled cancels.
    /// The letter and the sale's mirror field commit together.
    pub fn change_status(
        &self,
        kind: LetterKind,
        id: &LetterId,
        decision: LetterDecision,
        actor: &Actor,
    ) -> Result<Letter, LetterError> {
        self.ensure_allowed(actor, review_operation(kind))?;

        let mut letter = self
            .letters
            .fetch(id)?
            .filter(|letter| letter.kind == kind)
            .ok_or(LetterError::NotFound { kind })?;

        let previous = letter.status;
        let next = match decision {
            LetterDecision::Approved => LetterStatus::Issued,
            LetterDecision::Canceled => LetterStatus::Canceled,
        };
        letter.status = next;
        letter.updated_at = Utc::now();
        letter.audit.record(
            AuditAction::StatusChanged,
            changed_fields([(
                "status",
                match next {
                    LetterStatus::Issued => kind.issued_label().to_string(),
                    LetterStatus::Canceled => "canceled".to_string(),
                },
            )]),
            actor,
        );
        self.letters.update(letter.clone())?;

        let mut sale = match self.sales.fetch(&letter.sale_id) {
            Ok(Some(sale)) => sale,
            Ok(None) => return Err(LetterError::SaleNotAvailable),
            Err(err) => {
                self.revert_letter_status(&letter, previous, actor);
                return Err(LetterError::Store(err));
            }
        };
        let link = LetterLink {
            id: letter.id.clone(),
            status: next,
        };
        set_link(&mut sale, kind, Some(link));
        sale.updated_at = Utc::now();
        sale.audit.record(
            AuditAction::Updated,
            changed_fields([(
                status_field(kind),
                match next {
                    LetterStatus::Issued => kind.issued_label().to_string(),
                    LetterStatus::Canceled => "canceled".to_string(),
                },
            )]),
            actor,
        );
        if let Err(err) = self.sales.update(sale) {
            self.revert_letter_status(&letter, previous, actor);
            return Err(LetterError::Store(err));
        }

        Ok(letter)
    }

    /// Remove the letter and clear the sale's mirror link.
    pub fn delete(
        &self,
        kind: LetterKind,
        id: &LetterId,
        actor: &Actor,
    ) -> Result<(), LetterError> {
        self.ensure_allowed(actor, delete_operation(kind))?;

        let letter = self
            .letters
            .fetch(id)?
            .filter(|letter| letter.kind == kind)
            .ok_or(LetterError::NotFound { kind })?;

        self.letters.delete(&letter.id)?;

        if let Some(mut sale) = self.sales.fetch(&letter.sale_id)? {
            set_link(&mut sale, kind, None);
            sale.updated_at = Utc::now();
            sale.audit.record(
                AuditAction::Updated,
                changed_fields([(status_field(kind), "none".to_string())]),
                actor,
            );
            self.sales.update(sale)?;
        }

        Ok(())
    }

    fn revert_letter_status(&self, letter: &Letter, previous: LetterStatus, actor: &Actor) {
        let mut reverted = letter.clone();
        reverted.status = previous;
        reverted.audit.record(
            AuditAction::StatusChanged,
            changed_fields([("status", "reverted".to_string())]),
            actor,
        );
        let _ = self.letters.update(reverted);
    }

    fn ensure_allowed(&self, actor: &Actor, operation: Operation) -> Result<(), LetterError> {
        if can_perform(actor.role, operation) {
            Ok(())
        } else {
            Err(LetterError::PermissionDenied {
                role: actor.role,
                operation,
            })
        }
    }
}

const fn issue_operation(kind: LetterKind) -> Operation {
    match kind {
        LetterKind::Offer => Operation::IssueOffer,
        LetterKind::Allocation => Operation::IssueAllocation,
    }
}

const fn review_operation(kind: LetterKind) -> Operation {
    match kind {
        LetterKind::Offer => Operation::ReviewOffer,
        LetterKind::Allocation => Operation::ReviewAllocation,
    }
}

const fn delete_operation(kind: LetterKind) -> Operation {
    match kind {
        LetterKind::Offer => Operation::DeleteOffer,
        LetterKind::Allocation => Operation::DeleteAllocation,
    }
}

fn set_link(sale: &mut Sale, kind: LetterKind, link: Option<LetterLink>) {
    match kind {
        LetterKind::Offer => sale.offer = link,
        LetterKind::Allocation => sale.allocation = link,
    }
}

const fn link_field(kind: LetterKind) -> &'static str {
    match kind {
        LetterKind::Offer => "offer_id",
        LetterKind::Allocation => "allocation_id",
    }
}

const fn status_field(kind: LetterKind) -> &'static str {
    match kind {
        LetterKind::Offer => "offer_status",
        LetterKind::Allocation => "allocation_status",
    }
}

fn issued_message(sale: &Sale, letter: &Letter, kind: LetterKind) -> NotificationMessage {
    let category = match kind {
        LetterKind::Offer => NotificationCategory::Offer,
        LetterKind::Allocation => NotificationCategory::Allocation,
    };
    NotificationMessage::to_client(
        sale.client.email.clone(),
        format!("Your {} letter {}", kind.label(), letter.number),
        format!(
            "Dear {}, your {} letter {} for sale {} is ready: {}",
            sale.client.name,
            kind.label(),
            letter.number,
            sale.id.0,
            letter.file_url
        ),
        category,
    )
}

/// Error raised by the offer/allocation managers.
#[derive(Debug, thiserror::Error)]
pub enum LetterError {
    #[error("sale not available")]
    SaleNotAvailable,
    #[error("{} letter not found", kind.label())]
    NotFound { kind: LetterKind },
    #[error("unable to {} a pending sale", kind.label())]
    PendingSale { kind: LetterKind },
    #[error("unable to {} a declined sale", kind.label())]
    DeclinedSale { kind: LetterKind },
    #[error("role {} may not perform {operation:?}", role.label())]
    PermissionDenied { role: ActorRole, operation: Operation },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LetterError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            LetterError::SaleNotAvailable | LetterError::NotFound { .. } => FailureKind::NotFound,
            LetterError::PermissionDenied { .. } => FailureKind::PermissionDenied,
            LetterError::PendingSale { .. } | LetterError::DeclinedSale { .. } => {
                FailureKind::StateConflict
            }
            LetterError::Store(StoreError::NotFound) => FailureKind::NotFound,
            LetterError::Store(StoreError::Conflict) => FailureKind::StateConflict,
            LetterError::Store(StoreError::Unavailable(_)) => FailureKind::Internal,
        }
    }
}
